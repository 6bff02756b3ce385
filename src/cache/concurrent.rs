//! The thread-safe row cache variant (§4.3 "Cache contract (thread-safe
//! variant)"), used by the chunking trainer to build active-subtensors from
//! multiple worker threads concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::creator::RowCreator;
use super::stats::{CacheStatistics, StatCounters};

struct Entry {
    row: Arc<Vec<f32>>,
    last_used: u64,
}

struct Inner {
    rows: HashMap<usize, Entry>,
    diagonal: Option<Vec<f32>>,
    tick: u64,
    stats: StatCounters,
}

/// MRU-indexed row cache guarded by a single mutex. Every `row` call locks
/// for the duration of the fetch, including a miss's `compute_row` — the row
/// creators already parallelise a single row's computation internally
/// (`StaticParallelRowCreator`, `WorkStealingRowCreator`), so there is
/// nothing to gain from letting two threads race to compute the same row.
pub struct RowCache<T, C: RowCreator<T>> {
    creator: C,
    max_count: usize,
    inner: Mutex<Inner>,
    _marker: std::marker::PhantomData<T>,
}

impl<T, C: RowCreator<T>> RowCache<T, C> {
    pub fn new(creator: C, max_count: usize) -> RowCache<T, C> {
        RowCache {
            creator,
            max_count: max_count.max(1),
            inner: Mutex::new(Inner {
                rows: HashMap::new(),
                diagonal: None,
                tick: 0,
                stats: StatCounters::default(),
            }),
            _marker: std::marker::PhantomData,
        }
    }

    /// The full diagonal `Q_ii`, computed once across all callers and
    /// memoised; concurrent callers racing on an empty diagonal all block on
    /// the same mutex rather than duplicating the work.
    pub fn diagonal(&self) -> Vec<f32> {
        {
            let guard = self.inner.lock().unwrap();
            if let Some(diag) = &guard.diagonal {
                return diag.clone();
            }
        }
        let p = self.creator.p();
        let diag: Vec<f32> = (0..p).map(|i| self.row_handle(i)[i]).collect();
        let mut guard = self.inner.lock().unwrap();
        guard.diagonal.get_or_insert(diag).clone()
    }

    /// The `i`-th signed-Gram row.
    pub fn row(&self, i: usize) -> Vec<f32> {
        (*self.row_handle(i)).clone()
    }

    /// Same row as [`RowCache::row`], but shared rather than cloned — the
    /// handle stays valid even if a later call evicts `i`, which is what
    /// lets [`super::tensors`] build active-subtensors that outlive any
    /// single fetch.
    pub fn row_handle(&self, i: usize) -> Arc<Vec<f32>> {
        let mut guard = self.inner.lock().unwrap();
        guard.tick += 1;
        let tick = guard.tick;

        if let Some(entry) = guard.rows.get_mut(&i) {
            entry.last_used = tick;
            guard.stats.record(true);
            return entry.row.clone();
        }
        guard.stats.record(false);
        drop(guard);

        let row = Arc::new(self.creator.compute_row(i));

        let mut guard = self.inner.lock().unwrap();
        if guard.rows.len() >= self.max_count && !guard.rows.contains_key(&i) {
            Self::evict_one(&mut guard.rows);
        }
        guard.tick += 1;
        let tick = guard.tick;
        guard.rows.insert(
            i,
            Entry {
                row: row.clone(),
                last_used: tick,
            },
        );
        row
    }

    fn evict_one(rows: &mut HashMap<usize, Entry>) {
        if let Some((&victim, _)) = rows.iter().min_by_key(|(_, entry)| entry.last_used) {
            rows.remove(&victim);
        }
    }

    pub fn p(&self) -> usize {
        self.creator.p()
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().rows.clear();
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    pub fn statistics(&self) -> CacheStatistics {
        let guard = self.inner.lock().unwrap();
        guard.stats.snapshot(guard.rows.len())
    }

    pub fn reset_statistics(&self) {
        self.inner.lock().unwrap().stats.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::creator::SerialRowCreator;
    use crate::kernel::LinearKernel;
    use std::sync::Arc as StdArc;

    fn cache_of(max_count: usize) -> RowCache<Vec<f64>, SerialRowCreator<Vec<f64>, LinearKernel>> {
        let items = StdArc::new(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![2.0, -1.0],
            vec![-1.0, -1.0],
        ]);
        let labels = StdArc::new(vec![1.0, -1.0, 1.0, -1.0, 1.0]);
        let creator = SerialRowCreator::new(LinearKernel::new(), items, labels);
        RowCache::new(creator, max_count)
    }

    #[test]
    fn row_matches_fresh_compute_regardless_of_eviction() {
        let cache = cache_of(2);
        let reference = cache_of(usize::MAX);
        for i in [0, 1, 2, 3, 4, 0, 2, 4, 1, 3] {
            assert_eq!(cache.row(i), reference.row(i));
        }
    }

    #[test]
    fn never_exceeds_capacity() {
        let cache = cache_of(2);
        for i in 0..5 {
            cache.row(i);
            assert!(cache.statistics().items <= 2);
        }
    }

    #[test]
    fn concurrent_access_is_consistent() {
        use std::thread;

        let cache = StdArc::new(cache_of(3));
        let reference = cache_of(usize::MAX);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..5 {
                        let row = cache.row((i + t) % 5);
                        assert_eq!(row.len(), 5);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        for i in 0..5 {
            assert_eq!(cache.row(i), reference.row(i));
        }
    }

    #[test]
    fn row_handle_survives_eviction_of_its_index() {
        let cache = cache_of(1);
        let handle = cache.row_handle(0);
        cache.row(1);
        cache.row(2);
        assert_eq!(handle.len(), 5);
    }
}
