//! Conjugate-gradient line search at a single, fixed barrier level (§4.2
//! "Choice of inner solver" / line-search variant).

use super::{norm, Certificate, ConstrainedMinimizer, Lagrangian, LogBarrier, MinimizerOptions,
            MuEstimator};

/// Solves the barrier-penalised subproblem `min t·L(λ) + φ(λ)` at a single
/// fixed `t = options.initial_barrier_t`, taking preconditioned
/// conjugate-gradient steps with backtracking to stay inside `(0, C)^{|B|}`.
pub struct LineSearchMinimizer {
    options: MinimizerOptions,
}

impl LineSearchMinimizer {
    pub fn new(options: MinimizerOptions) -> LineSearchMinimizer {
        LineSearchMinimizer { options }
    }

    fn merit(&self, lagrangian: &Lagrangian, barrier: &LogBarrier, t: f64, lambda: &[f64]) -> f64 {
        t * lagrangian.value(lambda) + barrier.value(lambda)
    }

    fn backtrack(
        &self,
        lagrangian: &Lagrangian,
        barrier: &LogBarrier,
        t: f64,
        lambda: &[f64],
        direction: &[f64],
        current_merit: f64,
    ) -> Vec<f64> {
        let mut step = 1.0;
        for _ in 0..30 {
            let candidate: Vec<f64> = lambda
                .iter()
                .zip(direction)
                .map(|(&l, &d)| l + step * d)
                .collect();
            if !barrier.out_of_domain(&candidate)
                && self.merit(lagrangian, barrier, t, &candidate) <= current_merit
            {
                return candidate;
            }
            step *= 0.5;
        }
        lambda.to_vec()
    }
}

impl ConstrainedMinimizer for LineSearchMinimizer {
    fn minimize(
        &self,
        lagrangian: &Lagrangian,
        barrier: &LogBarrier,
        _mu: &MuEstimator,
        lambda0: Vec<f64>,
    ) -> Certificate {
        let n = lagrangian.len().max(1) as f64;
        let t = self.options.initial_barrier_t;
        let qbb_diagonal = lagrangian.qbb_diagonal();
        let mut lambda = lambda0;
        let mut converged = false;
        let mut iterations = 0;

        for _ in 0..self.options.max_cg_iterations {
            iterations += 1;

            let grad_l = lagrangian.gradient(&lambda);
            let grad_phi = barrier.gradient(&lambda);
            let g: Vec<f64> = grad_l
                .iter()
                .zip(&grad_phi)
                .map(|(gl, gp)| t * gl + gp)
                .collect();

            let diag_h_phi = barrier.diagonal_hessian(&lambda);
            let precond = super::jacobi_preconditioner(t, &qbb_diagonal, &diag_h_phi);
            let mg: Vec<f64> = g.iter().zip(&precond).map(|(&gi, &mi)| mi * gi).collect();

            let g_norm = norm(&mg) / n;
            if g_norm < self.options.epsilon {
                converged = true;
                break;
            }

            let direction: Vec<f64> = mg.iter().map(|&m| -m).collect();
            let current_merit = self.merit(lagrangian, barrier, t, &lambda);
            let next = self.backtrack(lagrangian, barrier, t, &lambda, &direction, current_merit);

            let delta: Vec<f64> = next
                .iter()
                .zip(&lambda)
                .map(|(&a, &b)| a - b)
                .collect();
            let delta_norm = norm(&delta) / n;
            lambda = next;

            if delta_norm < self.options.epsilon {
                converged = true;
                break;
            }
        }

        Certificate {
            optimum: lambda,
            iterations,
            converged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::creator::SerialRowCreator;
    use crate::cache::{active_subtensors, RowCache};
    use crate::kernel::LinearKernel;
    use std::sync::Arc;

    #[test]
    fn minimizes_a_small_separable_subproblem() {
        let items = Arc::new(vec![vec![1.0, 0.0], vec![-1.0, 0.0]]);
        let labels = Arc::new(vec![1.0, -1.0]);
        let cache = RowCache::new(
            SerialRowCreator::new(LinearKernel::new(), items, labels),
            16,
        );
        let b = vec![0usize, 1];
        let subtensors = active_subtensors(&cache, &b, &[]);
        let lagrangian = Lagrangian::new(&subtensors.qbb, vec![-1.0, -1.0]);
        let barrier = LogBarrier::new(1.0);
        let mu = MuEstimator::new(1.0);

        let minimizer = LineSearchMinimizer::new(MinimizerOptions {
            max_cg_iterations: 200,
            ..MinimizerOptions::default()
        });
        let certificate = minimizer.minimize(&lagrangian, &barrier, &mu, vec![0.5, 0.5]);

        for &l in &certificate.optimum {
            assert!(l > 0.0 && l < 1.0);
        }
    }
}
