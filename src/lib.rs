//! `ksvm-core`: a kernel-based binary SVM dual-optimizer training core.
//!
//! Two dual solvers are provided over a shared parallel Hessian row cache:
//! [`trainer::coordinate_descent`] (steepest-violator coordinate descent
//! with shrinking) and [`trainer::chunking`] (working-set chunking with an
//! interior-point inner solve). Both operate on the L1 soft-margin dual with
//! the intercept absorbed into the kernel (no SMO-style equality
//! constraint); see [`classifier::BinaryClassifier`] for the public entry
//! point binding a kernel to a trainer.
//!
//! This crate supplies `kernel` and the two trainers; callers bring their
//! own [`kernel::Kernel`] implementation for anything beyond the
//! [`kernel::LinearKernel`] and [`kernel::GaussianKernel`] reference
//! implementations used by this crate's own tests.

pub mod cache;
pub mod classifier;
pub mod data;
pub mod error;
pub mod kernel;
pub mod minimizer;
pub mod options;
pub mod partition;
pub mod trainer;

pub use classifier::BinaryClassifier;
pub use data::TrainingPair;
pub use error::{Error, Result};
pub use trainer::TrainOutcome;
