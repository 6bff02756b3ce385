//! Crate error type.
//!
//! Precondition violations halt training immediately and surface here.
//! Non-convergence and numerical degeneracy that the dual solvers can
//! recover a best-effort answer from are *not* represented as errors; see
//! [`crate::trainer::TrainOutcome`].

use thiserror::Error;

/// Errors raised by argument validation and irrecoverable numerical
/// degeneracy.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A precondition on the inputs or options was violated: a non-positive
    /// `C`, a training set with only one class, an option outside its
    /// valid range, and so on.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Human-readable description of which precondition failed.
        message: String,
    },

    /// The kernel produced a zero or negative Hessian diagonal entry
    /// `Q_ii`, which is impossible for a strictly positive-semidefinite
    /// kernel. The kernel contract guarantees this cannot happen; if it
    /// does, the kernel itself is broken and continuing would divide by
    /// zero or loop forever.
    #[error("degenerate kernel: Q[{index}][{index}] is not positive")]
    DegenerateKernel {
        /// Index of the offending training pair.
        index: usize,
    },
}

impl Error {
    pub(crate) fn invalid_argument<S: Into<String>>(message: S) -> Error {
        Error::InvalidArgument {
            message: message.into(),
        }
    }
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
