//! The two dual-optimizer trainers (§4.1, §4.2) and the small amount of
//! machinery they share: the non-convergence status type and the
//! disjoint-by-index parallel primitives used by both (§5).

pub mod chunking;
pub mod coordinate_descent;

use std::sync::Arc;

use crate::data::TrainingPair;
use crate::kernel::Kernel;
use crate::options::ParallelismOptions;
#[cfg(feature = "parallel")]
use crate::partition::StaticRangePartitioner;

/// Whether training reached the configured KKT tolerance, or was cut off
/// by its iteration cap (§7 "Non-convergence ... is reported through the
/// return value, never by tearing down the process").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainOutcome {
    Converged { iterations: usize },
    MaxIterationsReached { iterations: usize },
}

impl TrainOutcome {
    pub fn iterations(&self) -> usize {
        match *self {
            TrainOutcome::Converged { iterations } => iterations,
            TrainOutcome::MaxIterationsReached { iterations } => iterations,
        }
    }

    pub fn converged(&self) -> bool {
        matches!(self, TrainOutcome::Converged { .. })
    }
}

/// `(αᵢ·yᵢ, xᵢ)` for every `i` with `αᵢ > ε_c` (§4.1 step 3, §4.2 step 3).
pub(crate) fn support_vector_components<T: Clone>(
    pairs: &[TrainingPair<T>],
    alpha: &[f64],
    constraint_threshold: f64,
) -> Vec<(f64, T)> {
    pairs
        .iter()
        .zip(alpha)
        .filter(|(_, &a)| a > constraint_threshold)
        .map(|(pair, &a)| (a * pair.y(), pair.item().clone()))
        .collect()
}

/// `dst[k] += coeff * row[k]` over every `k`, optionally split across
/// `max_processors` disjoint contiguous slices of `dst` (§5: writes are
/// disjoint-by-index, so no atomics are needed once the slice is split).
pub(crate) fn axpy_full(dst: &mut [f64], coeff: f64, row: &[f32], max_processors: usize) {
    #[cfg(feature = "parallel")]
    {
        if max_processors > 1 && dst.len() > 1 {
            parallel_axpy_full(dst, coeff, row, max_processors);
            return;
        }
    }
    let _ = max_processors;
    for (d, &r) in dst.iter_mut().zip(row) {
        *d += coeff * r as f64;
    }
}

#[cfg(feature = "parallel")]
fn parallel_axpy_full(dst: &mut [f64], coeff: f64, row: &[f32], max_processors: usize) {
    use rayon::prelude::*;

    let partitioner = StaticRangePartitioner::new(0, dst.len(), max_processors);
    let mut remaining = dst;
    let mut slices = Vec::with_capacity(partitioner.partition_count());
    for range in partitioner.ranges() {
        let len = range.end - range.start;
        let (head, tail) = remaining.split_at_mut(len);
        slices.push((range, head));
        remaining = tail;
    }

    slices.into_par_iter().for_each(|(range, slice)| {
        for (slot, &r) in slice.iter_mut().zip(&row[range.clone()]) {
            *slot += coeff * r as f64;
        }
    });
}

/// `dst[j] += coeff * row[j]` for every `j` in the sorted ascending slice
/// `indices`, partitioned the same way as [`axpy_full`] but skipping
/// positions outside `indices` within each slice.
pub(crate) fn axpy_restricted(
    dst: &mut [f64],
    coeff: f64,
    row: &[f32],
    indices: &[usize],
    max_processors: usize,
) {
    #[cfg(feature = "parallel")]
    {
        if max_processors > 1 && indices.len() > 1 {
            parallel_axpy_restricted(dst, coeff, row, indices, max_processors);
            return;
        }
    }
    let _ = max_processors;
    for &j in indices {
        dst[j] += coeff * row[j] as f64;
    }
}

#[cfg(feature = "parallel")]
fn parallel_axpy_restricted(
    dst: &mut [f64],
    coeff: f64,
    row: &[f32],
    indices: &[usize],
    max_processors: usize,
) {
    use rayon::prelude::*;

    let partitioner = StaticRangePartitioner::new(0, dst.len(), max_processors);
    let mut remaining = dst;
    let mut slices = Vec::with_capacity(partitioner.partition_count());
    for range in partitioner.ranges() {
        let len = range.end - range.start;
        let (head, tail) = remaining.split_at_mut(len);
        slices.push((range, head));
        remaining = tail;
    }

    slices.into_par_iter().for_each(|(range, slice)| {
        let lo = indices.partition_point(|&j| j < range.start);
        let hi = indices.partition_point(|&j| j < range.end);
        for &j in &indices[lo..hi] {
            slice[j - range.start] += coeff * row[j] as f64;
        }
    });
}

/// Picks the static-parallel row creator when the `parallel` feature is
/// enabled, the serial one otherwise. Both trainers fork a fresh, empty
/// kernel from the caller's `kernel` (§4.3: row creators must obtain a
/// forked evaluator of their own).
#[cfg(feature = "parallel")]
pub(crate) fn build_row_creator<T, K>(
    kernel: &K,
    items: Arc<Vec<T>>,
    labels: Arc<Vec<f64>>,
    parallelism: &ParallelismOptions,
) -> crate::cache::StaticParallelRowCreator<T, K>
where
    T: Clone + Send + Sync,
    K: Kernel<T> + Clone,
{
    crate::cache::StaticParallelRowCreator::new(
        kernel.clone(),
        items,
        labels,
        parallelism.max_processors,
    )
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn build_row_creator<T, K>(
    kernel: &K,
    items: Arc<Vec<T>>,
    labels: Arc<Vec<f64>>,
    _parallelism: &ParallelismOptions,
) -> crate::cache::SerialRowCreator<T, K>
where
    T: Clone + Send + Sync,
    K: Kernel<T> + Clone,
{
    crate::cache::SerialRowCreator::new(kernel.clone(), items, labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TrainingPair;

    #[test]
    fn support_vector_components_filters_and_signs_weights() {
        let pairs = vec![
            TrainingPair::new(vec![1.0], 1.0),
            TrainingPair::new(vec![2.0], -1.0),
            TrainingPair::new(vec![3.0], 1.0),
        ];
        let alpha = [0.5, 0.0, 1e-9];
        let svs = support_vector_components(&pairs, &alpha, 1e-5);
        assert_eq!(svs.len(), 1);
        assert_eq!(svs[0], (0.5, vec![1.0]));
    }

    #[test]
    fn axpy_full_matches_serial_definition() {
        let mut a = vec![0.0; 7];
        let mut b = vec![0.0; 7];
        let row: Vec<f32> = (0..7).map(|i| i as f32 * 0.5).collect();

        axpy_full(&mut a, 2.0, &row, 1);
        axpy_full(&mut b, 2.0, &row, 4);
        assert_eq!(a, b);
    }

    #[test]
    fn axpy_restricted_only_touches_named_indices() {
        let mut dst = vec![0.0; 10];
        let row: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let indices = vec![1usize, 4, 7, 8];

        axpy_restricted(&mut dst, 3.0, &row, &indices, 4);

        for (j, &v) in dst.iter().enumerate() {
            if indices.contains(&j) {
                assert_eq!(v, 3.0 * row[j] as f64);
            } else {
                assert_eq!(v, 0.0);
            }
        }
    }
}
