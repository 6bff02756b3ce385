//! Truncated-Newton barrier method (§4.2 "Choice of inner solver" /
//! truncated-Newton variant).

use super::{jacobi_preconditioner, preconditioned_cg, Certificate, ConstrainedMinimizer,
            Lagrangian, LogBarrier, MinimizerOptions, MuEstimator};

/// At each outer barrier level `t`, approximately solves the Newton system
/// `(t·H_L + H_φ) d = -(t·∇L + ∇φ)` by preconditioned CG, backtracks `d`
/// into the feasible region, and grows `t` until the duality-gap estimate
/// `|B|/t` falls to `|B|/1e8`.
pub struct TruncatedNewtonMinimizer {
    options: MinimizerOptions,
}

impl TruncatedNewtonMinimizer {
    pub fn new(options: MinimizerOptions) -> TruncatedNewtonMinimizer {
        TruncatedNewtonMinimizer { options }
    }

    fn backtrack(&self, barrier: &LogBarrier, lambda: &[f64], direction: &[f64]) -> Vec<f64> {
        let mut step = 1.0;
        for _ in 0..30 {
            let candidate: Vec<f64> = lambda
                .iter()
                .zip(direction)
                .map(|(&l, &d)| l + step * d)
                .collect();
            if !barrier.out_of_domain(&candidate) {
                return candidate;
            }
            step *= 0.5;
        }
        lambda.to_vec()
    }
}

impl ConstrainedMinimizer for TruncatedNewtonMinimizer {
    fn minimize(
        &self,
        lagrangian: &Lagrangian,
        barrier: &LogBarrier,
        mu: &MuEstimator,
        lambda0: Vec<f64>,
    ) -> Certificate {
        let size = lagrangian.len();
        let qbb_diagonal = lagrangian.qbb_diagonal();
        let mut lambda = lambda0;
        let mut t = self.options.initial_barrier_t;
        let mut iterations = 0;
        let mut converged = false;

        let gap_tolerance = size as f64 / 1e8;

        for _ in 0..self.options.max_outer_steps {
            iterations += 1;

            let grad_l = lagrangian.gradient(&lambda);
            let grad_phi = barrier.gradient(&lambda);
            let rhs: Vec<f64> = grad_l
                .iter()
                .zip(&grad_phi)
                .map(|(gl, gp)| -(t * gl + gp))
                .collect();

            let diag_h_phi = barrier.diagonal_hessian(&lambda);
            let precond = jacobi_preconditioner(t, &qbb_diagonal, &diag_h_phi);

            let apply = |v: &[f64]| -> Vec<f64> {
                let hl = lagrangian.hessian_apply(v);
                hl.iter()
                    .zip(&diag_h_phi)
                    .zip(v)
                    .map(|((&hli, &hphi), &vi)| t * hli + hphi * vi)
                    .collect()
            };

            let direction =
                preconditioned_cg(apply, &rhs, &precond, self.options.max_cg_iterations);
            lambda = self.backtrack(barrier, &lambda, &direction);

            let gap = mu.duality_gap(t, size);
            if gap <= gap_tolerance {
                converged = true;
                break;
            }
            t *= self.options.barrier_growth;
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
    fn drives_duality_gap_below_tolerance() {
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

        let minimizer = TruncatedNewtonMinimizer::new(MinimizerOptions::default());
        let certificate = minimizer.minimize(&lagrangian, &barrier, &mu, vec![0.5, 0.5]);

        assert!(certificate.converged);
        for &l in &certificate.optimum {
            assert!(l > 0.0 && l < 1.0);
        }
    }
}
