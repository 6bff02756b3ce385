//! Deterministic contiguous partitioning of index ranges (§2, §8 property 7).

/// Splits `[start, end)` into `n` contiguous, non-overlapping sub-ranges
/// whose union is `[start, end)`.
///
/// Used to hand each of `n` workers a disjoint slice of `{start..end}` to
/// write into during a parallel region (coordinate-descent's
/// selection/update/shrink loops, row creation), so that writes commute
/// without atomics (§5: "Writes are disjoint-by-index ... so no atomics are
/// required").
///
/// When `n` does not evenly divide `end - start`, the first `remainder`
/// partitions get one extra element, matching the usual contiguous-chunk
/// convention (e.g. `rayon`'s `par_chunks`).
#[derive(Debug, Clone, Copy)]
pub struct StaticRangePartitioner {
    start: usize,
    end: usize,
    n: usize,
}

impl StaticRangePartitioner {
    /// Partition `[start, end)` into (at most) `n` pieces. `n` is clamped to
    /// at least `1` and to the length of the range, so that no partition is
    /// ever empty.
    pub fn new(start: usize, end: usize, n: usize) -> StaticRangePartitioner {
        let len = end.saturating_sub(start);
        let n = n.max(1).min(len.max(1));
        StaticRangePartitioner { start, end, n }
    }

    /// The number of partitions actually produced (`<= n` requested, `>= 1`
    /// unless the input range was empty).
    pub fn partition_count(&self) -> usize {
        if self.end <= self.start {
            0
        } else {
            self.n
        }
    }

    /// The `[lo, hi)` bounds of the `i`-th partition, `i < partition_count()`.
    pub fn range(&self, i: usize) -> std::ops::Range<usize> {
        let len = self.end - self.start;
        let base = len / self.n;
        let remainder = len % self.n;
        let lo = self.start + i * base + i.min(remainder);
        let extra = if i < remainder { 1 } else { 0 };
        let hi = lo + base + extra;
        lo..hi
    }

    /// All partitions as a `Vec` of ranges, for callers that want to
    /// `rayon::scope` over them directly.
    pub fn ranges(&self) -> Vec<std::ops::Range<usize>> {
        (0..self.partition_count()).map(|i| self.range(i)).collect()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn coverage_property(start in 0usize..50, len in 0usize..200, n in 1usize..17) {
            let end = start + len;
            let p = StaticRangePartitioner::new(start, end, n);
            let ranges = p.ranges();

            let mut cursor = start;
            for r in &ranges {
                prop_assert_eq!(r.start, cursor);
                prop_assert!(r.end >= r.start);
                cursor = r.end;
            }
            prop_assert_eq!(cursor, end);
        }
    }
}
