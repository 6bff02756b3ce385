//! The constrained-minimisation collaborator the chunking trainer consumes
//! but does not own (§4.4, §6.3).
//!
//! `L`, `∇L`, `H_L`, `φ`, `∇φ`, `H_φ` and `μ` are not heap-allocated
//! closures: each is a small tagged struct closing over the working set's
//! `Q_BB` block and the box bound `C`, with plain methods for value /
//! gradient / Hessian-apply / diagonal (§9 "a re-implementation should
//! encode these as small tagged structs ... this avoids heap-allocated
//! closures in hot loops").

mod line_search;
mod truncated_newton;

pub use line_search::LineSearchMinimizer;
pub use truncated_newton::TruncatedNewtonMinimizer;

use crate::cache::QBB;

/// `L(λ) = ½ λᵀ Q_BB λ + g_c · λ`, the chunking subproblem's primal
/// objective (§4.2 step 4).
pub struct Lagrangian<'a> {
    qbb: &'a QBB,
    g_c: Vec<f64>,
}

impl<'a> Lagrangian<'a> {
    pub fn new(qbb: &'a QBB, g_c: Vec<f64>) -> Lagrangian<'a> {
        Lagrangian { qbb, g_c }
    }

    pub fn value(&self, lambda: &[f64]) -> f64 {
        let qlambda = self.qbb.apply(lambda);
        let quad: f64 = lambda.iter().zip(&qlambda).map(|(l, q)| l * q).sum::<f64>() * 0.5;
        let linear: f64 = lambda.iter().zip(&self.g_c).map(|(l, g)| l * g).sum();
        quad + linear
    }

    /// `∇L(λ) = Q_BB·λ + g_c`.
    pub fn gradient(&self, lambda: &[f64]) -> Vec<f64> {
        let qlambda = self.qbb.apply(lambda);
        qlambda
            .iter()
            .zip(&self.g_c)
            .map(|(q, g)| q + g)
            .collect()
    }

    /// `H_L = Q_BB`, constant in `λ`.
    pub fn hessian_apply(&self, v: &[f64]) -> Vec<f64> {
        self.qbb.apply(v)
    }

    pub fn qbb_diagonal(&self) -> Vec<f64> {
        self.qbb.diagonal()
    }

    pub fn len(&self) -> usize {
        self.g_c.len()
    }

    pub fn is_empty(&self) -> bool {
        self.g_c.is_empty()
    }
}

/// `φ(λ) = -Σ [log(λᵢ) + log(C - λᵢ)]`, the log-barrier keeping `λ` strictly
/// inside `(0, C)^{|B|}`.
pub struct LogBarrier {
    c: f64,
}

impl LogBarrier {
    pub fn new(c: f64) -> LogBarrier {
        LogBarrier { c }
    }

    pub fn value(&self, lambda: &[f64]) -> f64 {
        -lambda
            .iter()
            .map(|&l| l.ln() + (self.c - l).ln())
            .sum::<f64>()
    }

    pub fn gradient(&self, lambda: &[f64]) -> Vec<f64> {
        lambda
            .iter()
            .map(|&l| -1.0 / l + 1.0 / (self.c - l))
            .collect()
    }

    /// `diag(H_φ(λ))_i = 1/λᵢ² + 1/(C-λᵢ)²`. `H_φ` itself is diagonal, so
    /// this is the whole Hessian, not merely its diagonal extract.
    pub fn diagonal_hessian(&self, lambda: &[f64]) -> Vec<f64> {
        lambda
            .iter()
            .map(|&l| 1.0 / (l * l) + 1.0 / ((self.c - l) * (self.c - l)))
            .collect()
    }

    pub fn out_of_domain(&self, lambda: &[f64]) -> bool {
        lambda.iter().any(|&l| l <= 0.0 || l >= self.c)
    }
}

/// `μᵢ(t,λ)`, the dual-of-dual Lagrange-multiplier estimator giving
/// feasibility certificates for the `2·|B|` box constraints (§4.4).
pub struct MuEstimator {
    c: f64,
}

impl MuEstimator {
    pub fn new(c: f64) -> MuEstimator {
        MuEstimator { c }
    }

    /// Length `2·|B|`: `μᵢ = 1/(t·λᵢ)` for `i < |B|`, `1/(t·(C-λ_{i-|B|}))`
    /// otherwise.
    pub fn estimate(&self, t: f64, lambda: &[f64]) -> Vec<f64> {
        let lower = lambda.iter().map(|&l| 1.0 / (t * l));
        let upper = lambda.iter().map(|&l| 1.0 / (t * (self.c - l)));
        lower.chain(upper).collect()
    }

    /// Duality gap estimate `|B| / t`, used to drive the truncated-Newton
    /// barrier schedule (§4.2 "Truncated-Newton").
    pub fn duality_gap(&self, t: f64, size: usize) -> f64 {
        size as f64 / t
    }
}

/// `diag(M(t, λ)) = 1 / (t·diag(Q_BB) + diag(H_φ(λ)))`, the Jacobi
/// preconditioner shared by both inner solvers.
pub fn jacobi_preconditioner(t: f64, qbb_diagonal: &[f64], barrier_diagonal: &[f64]) -> Vec<f64> {
    qbb_diagonal
        .iter()
        .zip(barrier_diagonal)
        .map(|(&q, &h)| 1.0 / (t * q + h))
        .collect()
}

/// Result of an inner-solver run.
#[derive(Debug, Clone, PartialEq)]
pub struct Certificate {
    /// `λ*`, the subproblem optimum (or best iterate at truncation).
    pub optimum: Vec<f64>,
    /// Number of inner iterations actually taken.
    pub iterations: usize,
    /// Whether the configured tolerance was reached before `max_cg_iterations`.
    pub converged: bool,
}

/// Tunables shared by both inner-solver strategies (§6.3: "duality gap
/// tolerance, max CG iterations, barrier schedule parameters, stop
/// criterion predicate").
#[derive(Debug, Clone, PartialEq)]
pub struct MinimizerOptions {
    /// Generic convergence tolerance `ε`, used by the line-search variant's
    /// `‖Δλ‖/|B| < ε` / `‖M·g‖/|B| < ε` stopping rule.
    pub epsilon: f64,
    /// Cap on inner conjugate-gradient iterations per Newton system solve.
    pub max_cg_iterations: usize,
    /// Initial barrier parameter `t₀`.
    pub initial_barrier_t: f64,
    /// Multiplicative growth applied to `t` each outer barrier step.
    pub barrier_growth: f64,
    /// Outer cap, independent of the duality-gap criterion, so a
    /// pathological subproblem cannot loop forever.
    pub max_outer_steps: usize,
}

impl Default for MinimizerOptions {
    fn default() -> Self {
        MinimizerOptions {
            epsilon: 1e-3,
            max_cg_iterations: 50,
            initial_barrier_t: 1.0,
            barrier_growth: 10.0,
            max_outer_steps: 50,
        }
    }
}

/// Common capability shared by [`LineSearchMinimizer`] and
/// [`TruncatedNewtonMinimizer`] (§9: "two parallel concrete types
/// implementing a common ... capability", not a class hierarchy).
pub trait ConstrainedMinimizer {
    /// Minimise `lagrangian` subject to the box `(0, C)^{|B|}` enforced by
    /// `barrier`, starting from `lambda0` (seeded by the caller at `C/2`
    /// per §4.2 step 5).
    fn minimize(
        &self,
        lagrangian: &Lagrangian,
        barrier: &LogBarrier,
        mu: &MuEstimator,
        lambda0: Vec<f64>,
    ) -> Certificate;
}

/// Conjugate-gradient step on a quadratic `½ vᵀ A v - bᵀ v`, applying `A`
/// through `apply` and preconditioning with `precond`. Shared by both inner
/// solvers since both ultimately solve a preconditioned linear system.
pub(crate) fn preconditioned_cg(
    apply: impl Fn(&[f64]) -> Vec<f64>,
    b: &[f64],
    precond: &[f64],
    max_iterations: usize,
) -> Vec<f64> {
    let n = b.len();
    let mut x = vec![0.0; n];
    let mut r = b.to_vec();
    let mut z = precondition(&r, precond);
    let mut p = z.clone();
    let mut rz_old = dot(&r, &z);

    for _ in 0..max_iterations {
        if rz_old.abs() < 1e-18 {
            break;
        }
        let ap = apply(&p);
        let pap = dot(&p, &ap);
        if pap.abs() < 1e-18 {
            break;
        }
        let alpha = rz_old / pap;
        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }
        z = precondition(&r, precond);
        let rz_new = dot(&r, &z);
        let beta = rz_new / rz_old;
        for i in 0..n {
            p[i] = z[i] + beta * p[i];
        }
        rz_old = rz_new;
    }
    x
}

fn precondition(r: &[f64], precond: &[f64]) -> Vec<f64> {
    r.iter().zip(precond).map(|(&ri, &mi)| ri * mi).collect()
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::creator::SerialRowCreator;
    use crate::cache::{active_subtensors, RowCache};
    use crate::kernel::LinearKernel;
    use std::sync::Arc;

    fn cache() -> RowCache<Vec<f64>, SerialRowCreator<Vec<f64>, LinearKernel>> {
        let items = Arc::new(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]);
        let labels = Arc::new(vec![1.0, -1.0, 1.0]);
        RowCache::new(
            SerialRowCreator::new(LinearKernel::new(), items, labels),
            16,
        )
    }

    #[test]
    fn lagrangian_gradient_matches_finite_difference() {
        let cache = cache();
        let b = vec![0usize, 1, 2];
        let subtensors = active_subtensors(&cache, &b, &[]);
        let lagrangian = Lagrangian::new(&subtensors.qbb, vec![-1.0, -1.0, -1.0]);

        let lambda = vec![0.3, 0.4, 0.2];
        let analytic = lagrangian.gradient(&lambda);

        let h = 1e-6;
        for i in 0..lambda.len() {
            let mut plus = lambda.clone();
            plus[i] += h;
            let mut minus = lambda.clone();
            minus[i] -= h;
            let numeric = (lagrangian.value(&plus) - lagrangian.value(&minus)) / (2.0 * h);
            assert!((numeric - analytic[i]).abs() < 1e-3);
        }
    }

    #[test]
    fn barrier_diverges_at_domain_boundary() {
        let barrier = LogBarrier::new(1.0);
        assert!(!barrier.out_of_domain(&[0.5]));
        assert!(barrier.out_of_domain(&[0.0]));
        assert!(barrier.out_of_domain(&[1.0]));
    }

    #[test]
    fn mu_estimator_has_length_twice_b() {
        let mu = MuEstimator::new(1.0);
        let estimate = mu.estimate(1.0, &[0.3, 0.6]);
        assert_eq!(estimate.len(), 4);
    }
}
