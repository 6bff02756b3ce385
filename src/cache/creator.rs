//! Row creators (§4.3): three ways to produce one signed-Gram row
//! `result[j] = y_i * y_j * K(x_i, x_j) + bias` on demand, where `bias`
//! (`Kernel::bias`) is folded in unsigned rather than scaled by `y_i * y_j`
//! (§6.1: a kernel with no bias has `bias() == 0.0` and this reduces to the
//! plain signed-Gram entry).
//!
//! Every implementation forks the kernel once per call and carries `x_i`
//! as a single weight-`1.0` component on the fork, so that
//! `forked.compute_sum(x_j) == K(x_i, x_j)` (§4.3: "the fork enables
//! parallel kernel evaluation without shared mutable kernel state").

use std::sync::Arc;

use crate::kernel::Kernel;
use crate::partition::StaticRangePartitioner;

/// Produces one row of the signed-Gram Hessian on demand.
pub trait RowCreator<T>: Send + Sync {
    /// `result[j] = y_i * y_j * K(x_i, x_j) + bias` for `j` in `0..p()`.
    fn compute_row(&self, i: usize) -> Vec<f32>;

    /// Number of training pairs `P`.
    fn p(&self) -> usize;
}

fn forked_for<T, K: Kernel<T>>(kernel: &K, center: &T) -> K
where
    T: Clone,
{
    let mut forked = kernel.fork_new();
    forked.add_component(1.0, center.clone());
    forked
}

/// Shared read-only state every row creator needs: the kernel template to
/// fork from, the training items, and their `±1` labels.
struct RowCreatorData<T, K> {
    kernel: K,
    items: Arc<Vec<T>>,
    labels: Arc<Vec<f64>>,
}

impl<T, K: Kernel<T>> RowCreatorData<T, K>
where
    T: Clone,
{
    fn row_value(&self, forked: &K, yi: f64, j: usize) -> f32 {
        let yj = self.labels[j];
        let bias = forked.bias();
        // `forked.compute_sum` already carries `bias` (it's `K(x_i, x_j) +
        // bias`, §6.1); strip it back out before signing so `bias` itself
        // never gets multiplied by `y_i * y_j`.
        let raw = forked.compute_sum(&self.items[j]) - bias;
        (yi * yj * raw + bias) as f32
    }
}

/// Computes each row with a plain sequential `for` loop. The simplest and
/// lowest-overhead creator; the right default when `K(x, y)` is cheap and
/// uniform in cost across pairs.
pub struct SerialRowCreator<T, K> {
    data: RowCreatorData<T, K>,
}

impl<T: Clone, K: Kernel<T>> SerialRowCreator<T, K> {
    pub fn new(kernel: K, items: Arc<Vec<T>>, labels: Arc<Vec<f64>>) -> SerialRowCreator<T, K> {
        SerialRowCreator {
            data: RowCreatorData {
                kernel,
                items,
                labels,
            },
        }
    }
}

impl<T: Clone + Send + Sync, K: Kernel<T>> RowCreator<T> for SerialRowCreator<T, K> {
    fn compute_row(&self, i: usize) -> Vec<f32> {
        let forked = forked_for(&self.data.kernel, &self.data.items[i]);
        let yi = self.data.labels[i];
        (0..self.data.items.len())
            .map(|j| self.data.row_value(&forked, yi, j))
            .collect()
    }

    fn p(&self) -> usize {
        self.data.items.len()
    }
}

/// Computes each row by splitting `{0..P}` into contiguous equal-length
/// slices, one per worker, via [`StaticRangePartitioner`]. Good when every
/// pairwise evaluation costs about the same, so a static split keeps
/// workers balanced without the bookkeeping of work-stealing.
#[cfg(feature = "parallel")]
pub struct StaticParallelRowCreator<T, K> {
    data: RowCreatorData<T, K>,
    max_workers: usize,
}

#[cfg(feature = "parallel")]
impl<T: Clone, K: Kernel<T>> StaticParallelRowCreator<T, K> {
    pub fn new(
        kernel: K,
        items: Arc<Vec<T>>,
        labels: Arc<Vec<f64>>,
        max_workers: usize,
    ) -> StaticParallelRowCreator<T, K> {
        StaticParallelRowCreator {
            data: RowCreatorData {
                kernel,
                items,
                labels,
            },
            max_workers: max_workers.max(1),
        }
    }
}

#[cfg(feature = "parallel")]
impl<T: Clone + Send + Sync, K: Kernel<T> + Clone> RowCreator<T> for StaticParallelRowCreator<T, K> {
    fn compute_row(&self, i: usize) -> Vec<f32> {
        use rayon::prelude::*;

        let p = self.data.items.len();
        let partitioner = StaticRangePartitioner::new(0, p, self.max_workers);
        let forked = forked_for(&self.data.kernel, &self.data.items[i]);
        let yi = self.data.labels[i];

        let mut row = vec![0.0f32; p];
        let slices: Vec<&mut [f32]> = {
            let mut remaining = row.as_mut_slice();
            let mut out = Vec::with_capacity(partitioner.partition_count());
            for range in partitioner.ranges() {
                let len = range.end - range.start;
                let (head, tail) = remaining.split_at_mut(len);
                out.push(head);
                remaining = tail;
            }
            out
        };

        partitioner
            .ranges()
            .into_par_iter()
            .zip(slices.into_par_iter())
            .for_each(|(range, slice)| {
                for (slot, j) in slice.iter_mut().zip(range) {
                    *slot = self.data.row_value(&forked, yi, j);
                }
            });

        row
    }

    fn p(&self) -> usize {
        self.data.items.len()
    }
}

/// Computes each row with dynamic work-stealing over `j`. Preferred over
/// [`StaticParallelRowCreator`] when per-pair kernel cost varies widely
/// (e.g. variable-length sequence kernels), where a static split would
/// leave some workers idle while others are still busy.
#[cfg(feature = "parallel")]
pub struct WorkStealingRowCreator<T, K> {
    data: RowCreatorData<T, K>,
}

#[cfg(feature = "parallel")]
impl<T: Clone, K: Kernel<T>> WorkStealingRowCreator<T, K> {
    pub fn new(kernel: K, items: Arc<Vec<T>>, labels: Arc<Vec<f64>>) -> WorkStealingRowCreator<T, K> {
        WorkStealingRowCreator {
            data: RowCreatorData {
                kernel,
                items,
                labels,
            },
        }
    }
}

#[cfg(feature = "parallel")]
impl<T: Clone + Send + Sync, K: Kernel<T>> RowCreator<T> for WorkStealingRowCreator<T, K> {
    fn compute_row(&self, i: usize) -> Vec<f32> {
        use rayon::prelude::*;

        let forked = forked_for(&self.data.kernel, &self.data.items[i]);
        let yi = self.data.labels[i];

        (0..self.data.items.len())
            .into_par_iter()
            .map(|j| self.data.row_value(&forked, yi, j))
            .collect()
    }

    fn p(&self) -> usize {
        self.data.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::LinearKernel;

    fn fixture() -> (Arc<Vec<Vec<f64>>>, Arc<Vec<f64>>) {
        let items = Arc::new(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![-1.0, 0.5],
        ]);
        let labels = Arc::new(vec![1.0, -1.0, 1.0, -1.0]);
        (items, labels)
    }

    fn expected_row(items: &[Vec<f64>], labels: &[f64], i: usize) -> Vec<f32> {
        let k = LinearKernel::new();
        (0..items.len())
            .map(|j| (labels[i] * labels[j] * k.compute(&items[i], &items[j])) as f32)
            .collect()
    }

    #[test]
    fn serial_matches_definition() {
        let (items, labels) = fixture();
        let creator = SerialRowCreator::new(LinearKernel::new(), items.clone(), labels.clone());
        for i in 0..items.len() {
            assert_eq!(creator.compute_row(i), expected_row(&items, &labels, i));
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn static_parallel_matches_definition() {
        let (items, labels) = fixture();
        let creator =
            StaticParallelRowCreator::new(LinearKernel::new(), items.clone(), labels.clone(), 3);
        for i in 0..items.len() {
            assert_eq!(creator.compute_row(i), expected_row(&items, &labels, i));
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn work_stealing_matches_definition() {
        let (items, labels) = fixture();
        let creator = WorkStealingRowCreator::new(LinearKernel::new(), items.clone(), labels.clone());
        for i in 0..items.len() {
            assert_eq!(creator.compute_row(i), expected_row(&items, &labels, i));
        }
    }

    #[test]
    fn bias_is_added_unsigned_not_scaled_by_label_product() {
        let (items, labels) = fixture();
        let creator = SerialRowCreator::new(
            LinearKernel::new().with_bias(1.0),
            items.clone(),
            labels.clone(),
        );
        let k = LinearKernel::new();
        for i in 0..items.len() {
            let row = creator.compute_row(i);
            for j in 0..items.len() {
                let expected = labels[i] * labels[j] * k.compute(&items[i], &items[j]) + 1.0;
                assert_eq!(row[j], expected as f32);
            }
        }
    }

    #[test]
    fn row_is_symmetric() {
        let (items, labels) = fixture();
        let creator = SerialRowCreator::new(LinearKernel::new(), items.clone(), labels.clone());
        let rows: Vec<_> = (0..items.len()).map(|i| creator.compute_row(i)).collect();
        for i in 0..items.len() {
            for j in 0..items.len() {
                assert_eq!(rows[i][j], rows[j][i]);
            }
        }
    }
}
