//! The single-threaded row cache variant (§4.3 "Cache contract (sequential
//! variant)"), used by the trainers that orchestrate their own parallelism
//! externally and don't need the cache itself to be thread-safe.

use std::collections::HashMap;
use std::sync::Arc;

use super::creator::RowCreator;
use super::stats::{CacheStatistics, StatCounters};

struct Entry {
    row: Arc<Vec<f32>>,
    last_used: u64,
}

/// MRU-indexed row cache with no internal locking.
pub struct SequentialRowCache<T, C: RowCreator<T>> {
    creator: C,
    max_count: usize,
    rows: HashMap<usize, Entry>,
    diagonal: Option<Vec<f32>>,
    tick: u64,
    stats: StatCounters,
    _marker: std::marker::PhantomData<T>,
}

impl<T, C: RowCreator<T>> SequentialRowCache<T, C> {
    /// Build a cache bounded to `max_count` resident rows, backed by
    /// `creator` on a miss.
    pub fn new(creator: C, max_count: usize) -> SequentialRowCache<T, C> {
        SequentialRowCache {
            creator,
            max_count: max_count.max(1),
            rows: HashMap::new(),
            diagonal: None,
            tick: 0,
            stats: StatCounters::default(),
            _marker: std::marker::PhantomData,
        }
    }

    /// The full diagonal `Q_ii`, computed once on first call and memoised.
    pub fn diagonal(&mut self) -> &[f32] {
        if self.diagonal.is_none() {
            let p = self.creator.p();
            let diag = (0..p)
                .map(|i| {
                    let row = self.fetch(i);
                    row[i]
                })
                .collect();
            self.diagonal = Some(diag);
        }
        self.diagonal.as_ref().unwrap()
    }

    /// The `i`-th signed-Gram row, identical to what `RowCreator::compute_row`
    /// would produce, fetched from cache when resident or computed and
    /// inserted otherwise. Touching a row promotes it to most-recently-used.
    pub fn row(&mut self, i: usize) -> Vec<f32> {
        (*self.fetch(i)).clone()
    }

    /// Same as [`SequentialRowCache::row`] but avoids the clone by handing
    /// back the shared backing storage directly; used internally by
    /// [`super::tensors`] so the active-subtensor operators stay valid even
    /// if the row is later evicted from the cache.
    pub fn row_handle(&mut self, i: usize) -> Arc<Vec<f32>> {
        self.fetch(i)
    }

    fn fetch(&mut self, i: usize) -> Arc<Vec<f32>> {
        self.tick += 1;
        let tick = self.tick;

        if let Some(entry) = self.rows.get_mut(&i) {
            entry.last_used = tick;
            self.stats.record(true);
            return entry.row.clone();
        }

        self.stats.record(false);
        let row = Arc::new(self.creator.compute_row(i));

        if self.rows.len() >= self.max_count {
            self.evict_one();
        }
        self.rows.insert(
            i,
            Entry {
                row: row.clone(),
                last_used: tick,
            },
        );
        row
    }

    fn evict_one(&mut self) {
        if let Some((&victim, _)) = self
            .rows
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
        {
            self.rows.remove(&victim);
        }
    }

    /// Number of training pairs `P` (forwarded from the underlying row
    /// creator).
    pub fn p(&self) -> usize {
        self.creator.p()
    }

    /// Drop every cached row (the diagonal and statistics are untouched).
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Maximum number of rows this cache will hold at once.
    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Current hit/miss/occupancy snapshot.
    pub fn statistics(&self) -> CacheStatistics {
        self.stats.snapshot(self.rows.len())
    }

    /// Zero the hit/miss counters (occupancy is unaffected).
    pub fn reset_statistics(&mut self) {
        self.stats.reset();
    }
}
