//! Public binary-classifier façade (§6.4): binds a dual-optimizer trainer to
//! a kernel, absorbs the bias into the kernel, and exposes `train` /
//! `discriminate` / `is_trained`.
//!
//! Grounded on `smartcore::svm::svc::SVC`'s role as the public entry point
//! sitting in front of its SMO solver — `BinaryClassifier` plays the same
//! role here, except a caller picks which dual solver does the work by
//! calling `train_coordinate_descent` or `train_chunking`.

use crate::data::TrainingPair;
use crate::error::{Error, Result};
use crate::kernel::{Biased, Kernel};
use crate::minimizer::ConstrainedMinimizer;
use crate::options::{ChunkingOptions, CoordinateDescentOptions, ParallelismOptions};
use crate::trainer::{self, TrainOutcome};

/// A trained (or untrained) binary classifier over items of type `T`, using
/// kernel `K`.
///
/// The bias is folded into the kernel itself (`kernel.with_bias(1.0)`, §1
/// Non-goals: no SMO-style equality constraint is used to recover an
/// explicit intercept), so `K` here is always `Biased<K0>` for whatever
/// kernel the caller originally constructed.
pub struct BinaryClassifier<T, K: Kernel<T>> {
    kernel: Biased<K>,
    constraint_threshold: f64,
    trained: bool,
}

impl<T, K: Kernel<T>> BinaryClassifier<T, K> {
    /// Build an untrained classifier around `kernel`. The intercept is
    /// absorbed with `bias = 1.0`, per §6.1.
    pub fn new(kernel: K) -> BinaryClassifier<T, K> {
        BinaryClassifier {
            kernel: kernel.with_bias(1.0),
            constraint_threshold: 1e-5,
            trained: false,
        }
    }

    /// `discriminate(x) = kernel.compute_sum(x)` (§6.4): the sign is the
    /// predicted class, `0.0` before training.
    pub fn discriminate(&self, x: &T) -> f64 {
        self.kernel.compute_sum(x)
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }
}

impl<T, K> BinaryClassifier<T, K>
where
    T: Clone + Send + Sync,
    K: Kernel<T> + Clone,
{
    fn check_preconditions(pairs: &[TrainingPair<T>], c: f64) -> Result<()> {
        if c <= 0.0 {
            return Err(Error::invalid_argument("C must be positive"));
        }
        let positives = pairs.iter().filter(|p| p.is_positive()).count();
        if positives == 0 || positives == pairs.len() {
            return Err(Error::invalid_argument(
                "training set must contain at least one positive and one negative example",
            ));
        }
        Ok(())
    }

    fn absorb(&mut self, pairs: &[TrainingPair<T>], alpha: &[f64]) {
        for (weight, item) in trainer::support_vector_components(pairs, alpha, self.constraint_threshold) {
            self.kernel.add_component(weight, item);
        }
        self.trained = true;
    }

    /// Train with the coordinate-descent dual solver (§4.1). Clears any
    /// previously accumulated components before training (§6.4), and
    /// requires at least one example of each class (§7.1).
    pub fn train_coordinate_descent(
        &mut self,
        pairs: &[TrainingPair<T>],
        c: f64,
        options: &CoordinateDescentOptions,
        parallelism: &ParallelismOptions,
    ) -> Result<TrainOutcome> {
        Self::check_preconditions(pairs, c)?;
        self.kernel.clear_components();
        self.trained = false;
        self.constraint_threshold = options.constraint_threshold;

        let (alpha, outcome) =
            trainer::coordinate_descent::train(pairs, c, &self.kernel, options, parallelism)?;
        self.absorb(pairs, &alpha);
        Ok(outcome)
    }

    /// Train with the chunking dual solver (§4.2), using `minimizer` as the
    /// inner constrained-minimisation strategy for each working-set
    /// subproblem. Same preconditions and component-clearing behaviour as
    /// [`BinaryClassifier::train_coordinate_descent`].
    pub fn train_chunking<M: ConstrainedMinimizer>(
        &mut self,
        pairs: &[TrainingPair<T>],
        c: f64,
        options: &ChunkingOptions,
        parallelism: &ParallelismOptions,
        minimizer: &M,
    ) -> Result<TrainOutcome> {
        Self::check_preconditions(pairs, c)?;
        self.kernel.clear_components();
        self.trained = false;
        self.constraint_threshold = options.constraint_threshold;

        let (alpha, outcome) =
            trainer::chunking::train(pairs, c, &self.kernel, options, parallelism, minimizer)?;
        self.absorb(pairs, &alpha);
        Ok(outcome)
    }
}
