//! Tunable thresholds and limits for the two dual-optimizer trainers
//! (§2 "Solver-options value objects", §4.1, §4.2).

use crate::error::{Error, Result};

/// Options for [`crate::trainer::coordinate_descent`] (§4.1).
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateDescentOptions {
    /// Capacity of the Hessian row cache, in rows.
    pub cache_size: usize,
    /// `ε_c`: an index `i` with `α_i > ε_c` at termination is a support
    /// vector.
    pub constraint_threshold: f64,
    /// `ε_g`: KKT tolerance on the normalised gradient.
    pub gradient_threshold: f64,
    /// How many outer iterations between periodic shrinks.
    pub shrinking_period: usize,
    /// Whether to shrink the active set at all.
    pub use_shrinking: bool,
    /// Hard cap on outer iterations; reaching it ends training as
    /// non-converged (§4.1 "Failure semantics").
    pub max_iterations: usize,
}

impl Default for CoordinateDescentOptions {
    fn default() -> Self {
        CoordinateDescentOptions {
            cache_size: 200,
            constraint_threshold: 1e-5,
            gradient_threshold: 2e-3,
            shrinking_period: 1300,
            use_shrinking: true,
            max_iterations: 400_000,
        }
    }
}

impl CoordinateDescentOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.cache_size == 0 {
            return Err(Error::invalid_argument("cache_size must be positive"));
        }
        if self.constraint_threshold <= 0.0 {
            return Err(Error::invalid_argument(
                "constraint_threshold must be positive",
            ));
        }
        if self.gradient_threshold <= 0.0 {
            return Err(Error::invalid_argument(
                "gradient_threshold must be positive",
            ));
        }
        if self.max_iterations == 0 {
            return Err(Error::invalid_argument("max_iterations must be positive"));
        }
        Ok(())
    }
}

/// Options for [`crate::trainer::chunking`] (§4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkingOptions {
    /// Upper bound on the working-set size `|B|`.
    pub max_chunk_size: usize,
    /// `ε_c` for this trainer's KKT tolerance restatement.
    pub constraint_threshold: f64,
    /// `ε_g` for this trainer's KKT tolerance restatement.
    pub gradient_threshold: f64,
    /// Capacity of the Hessian row cache, in rows.
    pub cache_size: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        ChunkingOptions {
            max_chunk_size: 1000,
            constraint_threshold: 1e-3,
            gradient_threshold: 1e-3,
            cache_size: 2048,
        }
    }
}

impl ChunkingOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(Error::invalid_argument("max_chunk_size must be positive"));
        }
        if self.constraint_threshold <= 0.0 {
            return Err(Error::invalid_argument(
                "constraint_threshold must be positive",
            ));
        }
        if self.gradient_threshold <= 0.0 {
            return Err(Error::invalid_argument(
                "gradient_threshold must be positive",
            ));
        }
        if self.cache_size == 0 {
            return Err(Error::invalid_argument("cache_size must be positive"));
        }
        Ok(())
    }
}

/// Bounds on the fork-join worker pool used by the parallel row creators
/// and the parallel coordinate-descent trainer (§5).
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelismOptions {
    /// Maximum number of worker threads to use.
    pub max_processors: usize,
}

impl Default for ParallelismOptions {
    fn default() -> Self {
        ParallelismOptions {
            #[cfg(feature = "parallel")]
            max_processors: num_cpus::get(),
            #[cfg(not(feature = "parallel"))]
            max_processors: 1,
        }
    }
}

impl ParallelismOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_processors == 0 {
            return Err(Error::invalid_argument("max_processors must be positive"));
        }
        #[cfg(feature = "parallel")]
        {
            let available = num_cpus::get();
            if self.max_processors > available {
                return Err(Error::invalid_argument(format!(
                    "max_processors ({}) exceeds the {} processors this host reports",
                    self.max_processors, available
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(CoordinateDescentOptions::default().validate().is_ok());
        assert!(ChunkingOptions::default().validate().is_ok());
        assert!(ParallelismOptions::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_thresholds() {
        let mut opts = CoordinateDescentOptions::default();
        opts.gradient_threshold = 0.0;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn rejects_oversized_processor_count() {
        let opts = ParallelismOptions {
            max_processors: usize::MAX,
        };
        assert!(opts.validate().is_err());
    }
}
