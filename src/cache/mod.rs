//! The Hessian row cache: row creators, the sequential and thread-safe
//! cache variants, statistics, and the active-subtensor operators the
//! chunking trainer builds on top of it (§4.3).

pub mod concurrent;
pub mod creator;
pub mod sequential;
pub mod stats;
pub mod tensors;

pub use concurrent::RowCache;
pub use creator::RowCreator;
pub use sequential::SequentialRowCache;
pub use stats::CacheStatistics;
pub use tensors::{active_subtensors, ActiveSubtensors, QA, QBB, QBN};

#[cfg(feature = "parallel")]
pub use creator::{SerialRowCreator, StaticParallelRowCreator, WorkStealingRowCreator};
#[cfg(not(feature = "parallel"))]
pub use creator::SerialRowCreator;
