//! The kernel façade (§6.1).
//!
//! This is deliberately the narrowest possible boundary: the training core
//! (`cache`, `trainer`, `classifier`) only ever calls the handful of
//! operations declared on [`Kernel`]. Everything about *how* `K(x, y)` is
//! computed, how components are stored, and how a fork is produced is the
//! kernel implementation's business, not the solver's.
//!
//! [`LinearKernel`] and [`GaussianKernel`] are reference implementations
//! used by this crate's own tests and doctests; a real deployment is
//! expected to bring its own kernel (string kernels, tree kernels,
//! precomputed Gram matrices, ...).

mod gaussian;
mod linear;

pub use gaussian::GaussianKernel;
pub use linear::LinearKernel;

/// A bivariate positive-semidefinite similarity function over items of
/// type `T`, together with the small amount of mutable state (accumulated
/// weighted support-vector components) that a trained classifier needs to
/// evaluate its discriminant.
///
/// Implementations must be safe to call from multiple threads concurrently
/// through *independent* forks (see [`Kernel::fork_new`]); they need not be
/// `Sync` with respect to a single shared instance being mutated from
/// multiple threads, since the training core never does that.
pub trait Kernel<T>: Send {
    /// The bivariate kernel value `K(x, y)`.
    fn compute(&self, x: &T, y: &T) -> f64;

    /// `Σ_k w_k · K(c_k, x)` over the accumulated components, where `(w_k,
    /// c_k)` were added with [`Kernel::add_component`]. A freshly
    /// constructed kernel with no components returns `0.0`.
    fn compute_sum(&self, x: &T) -> f64;

    /// Append a weighted support-vector component.
    fn add_component(&mut self, weight: f64, x: T);

    /// Discard all accumulated components, e.g. before retraining.
    fn clear_components(&mut self);

    /// `true` once at least one component has been added.
    fn has_components(&self) -> bool;

    /// The constant additive shift `compute`/`compute_sum` fold in, `0.0`
    /// for a kernel with none. Exists so a signed-Gram row builder can strip
    /// the shift back out before applying `y_i * y_j` and re-add it
    /// unsigned (§6.1: the bias is a property of the discriminant, not a
    /// per-pair quantity that flips sign with the labels).
    fn bias(&self) -> f64 {
        0.0
    }

    /// An independent evaluator that shares no mutable state with `self`,
    /// suitable for handing to another thread. Any components accumulated
    /// so far are *not* required to carry over — row creators only ever
    /// fork a kernel before training has produced any components.
    fn fork_new(&self) -> Self
    where
        Self: Sized;

    /// Wrap `self` so that every pairwise evaluation is shifted by a
    /// constant `bias`. Used once, by [`crate::classifier::BinaryClassifier`],
    /// with `bias = 1.0` to absorb the intercept term `b` into the kernel
    /// itself (§1 Non-goals: the dual is solved without the usual SMO
    /// equality constraint that would otherwise be needed to recover `b`).
    ///
    /// This is spelled as a method rather than `impl Add<f64> for K`
    /// because Rust's orphan rules forbid implementing a foreign trait
    /// (`std::ops::Add`) for a bare generic type parameter, even one
    /// bounded by a local trait.
    fn with_bias(self, bias: f64) -> Biased<Self>
    where
        Self: Sized,
    {
        Biased { inner: self, bias }
    }
}

/// A kernel shifted by a constant additive bias, as produced by
/// [`Kernel::with_bias`].
#[derive(Debug, Clone)]
pub struct Biased<K> {
    inner: K,
    bias: f64,
}

impl<T, K: Kernel<T>> Kernel<T> for Biased<K> {
    fn compute(&self, x: &T, y: &T) -> f64 {
        self.inner.compute(x, y) + self.bias
    }

    fn compute_sum(&self, x: &T) -> f64 {
        self.inner.compute_sum(x) + self.bias
    }

    fn add_component(&mut self, weight: f64, x: T) {
        self.inner.add_component(weight, x);
    }

    fn clear_components(&mut self) {
        self.inner.clear_components();
    }

    fn has_components(&self) -> bool {
        self.inner.has_components()
    }

    fn bias(&self) -> f64 {
        self.bias
    }

    fn fork_new(&self) -> Self {
        Biased {
            inner: self.inner.fork_new(),
            bias: self.bias,
        }
    }
}
