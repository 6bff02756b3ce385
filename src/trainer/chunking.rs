//! Working-set chunking dual solver (§4.2): selects a working set `B` by
//! steepest feasible gradient, builds the restricted subproblem's tensor
//! operators, and delegates to an [`minimizer::ConstrainedMinimizer`].
//!
//! Grounded on the chunk-then-solve-a-restricted-subproblem pattern common
//! to active-set QP solvers (`examples/03hcl-smartcore/src/svm/svc.rs`'s
//! `process`/`reprocess` active-set maintenance), combined with
//! `examples/other_examples/1deed004_AutoPallet-optimization-engine__src-core-panoc-panoc_cache.rs.rs`'s
//! barrier-state bookkeeping for the inner solve.

use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::{active_subtensors, RowCache};
use crate::data::TrainingPair;
use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::minimizer::{ConstrainedMinimizer, Lagrangian, LogBarrier, MuEstimator};
use crate::options::{ChunkingOptions, ParallelismOptions};

use super::TrainOutcome;

/// A generous backstop against a pathological subproblem looping forever.
/// `ChunkingOptions` has no `max_iterations` field (the stopping check in
/// §4.2 step 2.3 is expected to always terminate the outer loop), so this
/// cap only guards against that guarantee failing to hold in practice.
const SAFETY_ITERATION_CAP: usize = 1_000_000;

/// Runs the chunking trainer to completion, returning the dense `α` vector
/// and the resulting [`TrainOutcome`]. `minimizer` is the caller's choice of
/// inner solver (`LineSearchMinimizer` or `TruncatedNewtonMinimizer`);
/// `kernel` must already carry whatever bias shift the caller wants folded
/// into the dual, exactly as for [`crate::trainer::coordinate_descent`].
pub fn train<T, K, M>(
    pairs: &[TrainingPair<T>],
    c: f64,
    kernel: &K,
    options: &ChunkingOptions,
    parallelism: &ParallelismOptions,
    minimizer: &M,
) -> Result<(Vec<f64>, TrainOutcome)>
where
    T: Clone + Send + Sync,
    K: Kernel<T> + Clone,
    M: ConstrainedMinimizer,
{
    options.validate()?;
    parallelism.validate()?;

    let p = pairs.len();
    let items: Arc<Vec<T>> = Arc::new(pairs.iter().map(|pair| pair.item().clone()).collect());
    let labels: Arc<Vec<f64>> = Arc::new(pairs.iter().map(|pair| pair.y()).collect());

    let row_creator = super::build_row_creator(kernel, items, labels, parallelism);
    let cache = RowCache::new(row_creator, options.cache_size);

    let diagonal = cache.diagonal();
    for (i, &qii) in diagonal.iter().enumerate() {
        if qii <= 0.0 {
            return Err(Error::DegenerateKernel { index: i });
        }
    }

    let mut alpha = vec![0.0f64; p];
    let mut g = vec![-1.0f64; p];
    let mut eliminated: HashSet<usize> = HashSet::new();
    let mut previous_active: HashSet<usize> = HashSet::new();

    let mu = MuEstimator::new(c);

    let mut iterations = 0usize;
    let outcome = loop {
        if iterations >= SAFETY_ITERATION_CAP {
            log::warn!(
                "chunking trainer exhausted its safety iteration cap ({}) without the stopping check firing",
                SAFETY_ITERATION_CAP
            );
            break TrainOutcome::MaxIterationsReached { iterations };
        }
        iterations += 1;

        let b = select_working_set(
            p,
            &alpha,
            &g,
            &diagonal,
            c,
            options.gradient_threshold,
            options.max_chunk_size,
            &eliminated,
        );

        log::debug!(
            "chunking rebuilt working set at iteration {}: |B| = {}",
            iterations,
            b.len()
        );

        let b_set: HashSet<usize> = b.iter().copied().collect();
        let b_subset_of_previous = b_set.iter().all(|i| previous_active.contains(i));

        if b.is_empty() || b_subset_of_previous {
            if eliminated.is_empty() {
                break TrainOutcome::Converged { iterations };
            }
            eliminated.clear();
            continue;
        }

        let n: Vec<usize> = (0..p).filter(|i| !b_set.contains(i)).collect();
        let subtensors = active_subtensors(&cache, &b, &n);

        let g_c: Vec<f64> = subtensors
            .qbn
            .apply(&alpha)
            .into_iter()
            .map(|v| v - 1.0)
            .collect();

        let lagrangian = Lagrangian::new(&subtensors.qbb, g_c);
        let barrier = LogBarrier::new(c);
        let lambda0 = vec![c / 2.0; b.len()];

        let certificate = minimizer.minimize(&lagrangian, &barrier, &mu, lambda0);

        let alpha_b: Vec<f64> = b.iter().map(|&i| alpha[i]).collect();
        let delta_lambda: Vec<f64> = certificate
            .optimum
            .iter()
            .zip(&alpha_b)
            .map(|(new, old)| new - old)
            .collect();

        let g_update = subtensors.qa.apply(&delta_lambda);
        for (gi, update) in g.iter_mut().zip(&g_update) {
            *gi += update;
        }
        for (&i, &lambda_i) in b.iter().zip(&certificate.optimum) {
            alpha[i] = lambda_i;
        }

        previous_active = b_set;
    };

    Ok((alpha, outcome))
}

/// §4.2 step 2.1-2.2: collect KKT-violating, non-eliminated indices and keep
/// up to `max_chunk_size` of them, ordered by ascending `|gᵢ/Qᵢᵢ|`.
fn select_working_set(
    p: usize,
    alpha: &[f64],
    g: &[f64],
    diagonal: &[f32],
    c: f64,
    eps_g: f64,
    max_chunk_size: usize,
    eliminated: &HashSet<usize>,
) -> Vec<usize> {
    let mut candidates: Vec<(usize, f64)> = (0..p)
        .filter(|i| !eliminated.contains(i))
        .filter_map(|i| {
            let ratio = g[i] / diagonal[i] as f64;
            let is_violator = if alpha[i] == 0.0 {
                ratio < -eps_g
            } else if alpha[i] == c {
                ratio > eps_g
            } else {
                ratio.abs() > eps_g
            };
            is_violator.then(|| (i, ratio.abs()))
        })
        .collect();

    candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
    let mut b: Vec<usize> = candidates
        .into_iter()
        .take(max_chunk_size)
        .map(|(i, _)| i)
        .collect();
    b.sort_unstable();
    b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::LinearKernel;
    use crate::minimizer::{LineSearchMinimizer, MinimizerOptions, TruncatedNewtonMinimizer};
    use approx::assert_relative_eq;

    fn toy_pairs() -> Vec<TrainingPair<Vec<f64>>> {
        vec![
            TrainingPair::new(vec![1.0, 0.0], 1.0),
            TrainingPair::new(vec![-1.0, 0.0], -1.0),
        ]
    }

    #[test]
    fn two_point_toy_matches_closed_form_with_line_search() {
        let pairs = toy_pairs();
        let kernel = LinearKernel::new().with_bias(1.0);
        let options = ChunkingOptions::default();
        let parallelism = ParallelismOptions { max_processors: 1 };
        // The line-search minimizer solves the barrier-penalised problem at
        // a single fixed t, so its distance from the true box-constrained
        // optimum is O(1/t); t = 1 (the default) isn't tight enough to land
        // within this test's tolerance of the closed form.
        let minimizer = LineSearchMinimizer::new(MinimizerOptions {
            max_cg_iterations: 200,
            initial_barrier_t: 1e4,
            ..MinimizerOptions::default()
        });

        let (alpha, outcome) =
            train(&pairs, 1.0, &kernel, &options, &parallelism, &minimizer).unwrap();
        assert!(outcome.converged());
        assert_relative_eq!(alpha[0], 0.25, epsilon = 1e-2);
        assert_relative_eq!(alpha[1], 0.25, epsilon = 1e-2);
    }

    #[test]
    fn two_point_toy_matches_closed_form_with_truncated_newton() {
        let pairs = toy_pairs();
        let kernel = LinearKernel::new().with_bias(1.0);
        let options = ChunkingOptions::default();
        let parallelism = ParallelismOptions { max_processors: 1 };
        let minimizer = TruncatedNewtonMinimizer::new(MinimizerOptions::default());

        let (alpha, outcome) =
            train(&pairs, 1.0, &kernel, &options, &parallelism, &minimizer).unwrap();
        assert!(outcome.converged());
        assert_relative_eq!(alpha[0], 0.25, epsilon = 1e-2);
        assert_relative_eq!(alpha[1], 0.25, epsilon = 1e-2);
    }

    #[test]
    fn box_feasibility_holds_after_training() {
        let pairs = toy_pairs();
        let kernel = LinearKernel::new().with_bias(1.0);
        let options = ChunkingOptions::default();
        let parallelism = ParallelismOptions { max_processors: 1 };
        let minimizer = LineSearchMinimizer::new(MinimizerOptions::default());

        let (alpha, _) = train(&pairs, 0.3, &kernel, &options, &parallelism, &minimizer).unwrap();
        for &a in &alpha {
            assert!(a >= 0.0 && a <= 0.3);
        }
    }
}
