//! Eviction Engine
//!
//! Runs a sweep when the store grows past `max_cache_size`. Only one sweep
//! runs at a time: writers that trip the threshold together serialize on a
//! mutex, and each re-checks the size after acquiring it so a burst of
//! concurrent writes does not trigger back-to-back sweeps.
//!
//! A sweep scores a snapshot of every entry, sorts ascending, and removes at
//! most `eviction_batch_size` of the lowest-scoring entries. The store may
//! still be over capacity afterwards; the next write that finds it so runs
//! another sweep.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use super::entry::CacheEntry;
use super::policy::EvictionPolicy;
use super::store::EntryStore;

/// Result of one eviction sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepOutcome {
    /// Entries scored
    pub scanned: usize,
    /// Entries actually removed
    pub evicted: usize,
}

/// Serialized, batch-bounded eviction
pub struct EvictionEngine {
    policy: EvictionPolicy,
    max_size: usize,
    batch_size: usize,
    lock: Mutex<()>,
}

impl EvictionEngine {
    /// Create an engine with the default scoring policy
    pub fn new(max_size: usize, batch_size: usize) -> Self {
        Self {
            policy: EvictionPolicy::default(),
            max_size,
            batch_size,
            lock: Mutex::new(()),
        }
    }

    /// Whether `store` is over capacity
    #[inline]
    pub fn should_evict<V>(&self, store: &EntryStore<V>) -> bool {
        store.len() > self.max_size
    }

    /// Sweep if the store is over capacity, returning `None` when no sweep ran
    pub fn evict_if_needed<V>(&self, store: &EntryStore<V>) -> Option<SweepOutcome> {
        if !self.should_evict(store) {
            return None;
        }

        let _guard = self.lock.lock();

        // Another writer may have swept while we waited
        if !self.should_evict(store) {
            return None;
        }

        Some(self.sweep_at(store, Utc::now()))
    }

    /// Hold the sweep lock while running `f`
    pub(crate) fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.lock.lock();
        f()
    }

    /// Run one sweep as of `now`; the caller must hold the sweep lock or own the store
    pub(crate) fn sweep_at<V>(&self, store: &EntryStore<V>, now: DateTime<Utc>) -> SweepOutcome {
        let started = Instant::now();
        let candidates = self.rank(store.snapshot(), now);
        let scanned = candidates.len();

        let mut evicted = 0;
        for entry in candidates.iter().take(self.batch_size) {
            // Skip entries removed or replaced since the snapshot
            if store.remove_entry(entry) {
                store.metrics().record_eviction();
                evicted += 1;
            }
        }
        store.metrics().record_sweep();

        debug!(
            scanned,
            evicted,
            remaining = store.len(),
            max_size = self.max_size,
            elapsed_us = started.elapsed().as_micros() as u64,
            "eviction sweep complete"
        );

        SweepOutcome { scanned, evicted }
    }

    /// Order entries from most to least evictable
    ///
    /// Ties on score fall back to the older access time, then to insertion order.
    /// Sort keys are read once per entry; readers keep bumping access times
    /// while the sort runs.
    pub fn rank<V>(
        &self,
        entries: Vec<Arc<CacheEntry<V>>>,
        now: DateTime<Utc>,
    ) -> Vec<Arc<CacheEntry<V>>> {
        let mut scored: Vec<RankKey<V>> = entries
            .into_iter()
            .map(|entry| RankKey {
                score: self.policy.score_entry(&entry, now),
                last_accessed_us: entry.last_accessed().timestamp_micros(),
                sequence: entry.sequence(),
                entry,
            })
            .collect();

        scored.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then(a.last_accessed_us.cmp(&b.last_accessed_us))
                .then(a.sequence.cmp(&b.sequence))
        });

        scored.into_iter().map(|key| key.entry).collect()
    }
}

/// Frozen ranking figures for one entry
struct RankKey<V> {
    score: f64,
    last_accessed_us: i64,
    sequence: u64,
    entry: Arc<CacheEntry<V>>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::Priority;
    use crate::cache::metrics::CacheMetrics;
    use chrono::Duration as ChronoDuration;
    use std::thread;
    use std::time::Duration;

    fn store() -> EntryStore<u32> {
        EntryStore::new(Arc::new(CacheMetrics::new()))
    }

    /// Insert an entry created `age_hours` ago, read `hits` times `idle_hours` ago
    fn insert_aged(
        store: &EntryStore<u32>,
        key: &str,
        priority: Priority,
        age_hours: i64,
        hits: u64,
        idle_hours: i64,
        now: DateTime<Utc>,
    ) {
        let created = now - ChronoDuration::hours(age_hours);
        let entry = CacheEntry::new(key, 0, priority, Duration::from_secs(30 * 86400), created);
        let accessed = now - ChronoDuration::hours(idle_hours);
        for _ in 0..hits {
            entry.record_access_at(accessed);
        }
        store.upsert(entry);
    }

    #[test]
    fn test_no_sweep_at_or_below_capacity() {
        let store = store();
        let engine = EvictionEngine::new(2, 1);
        let now = Utc::now();
        insert_aged(&store, "a", Priority::Normal, 1, 0, 1, now);
        insert_aged(&store, "b", Priority::Normal, 1, 0, 1, now);

        assert_eq!(engine.evict_if_needed(&store), None);
        assert_eq!(store.len(), 2);
        assert_eq!(store.metrics().sweeps(), 0);
    }

    #[test]
    fn test_evicts_exactly_lowest_score() {
        let store = store();
        let engine = EvictionEngine::new(2, 1);
        let now = Utc::now();

        // scores: busy = 50*10/1*1.5 = 750, idle = 5*10/(10+1)*1.5 ~ 6.8, cold = 0
        insert_aged(&store, "busy", Priority::Normal, 12, 50, 0, now);
        insert_aged(&store, "idle", Priority::Normal, 12, 5, 10, now);
        insert_aged(&store, "cold", Priority::Normal, 12, 0, 12, now);

        let outcome = engine.evict_if_needed(&store).unwrap();
        assert_eq!(outcome, SweepOutcome { scanned: 3, evicted: 1 });
        assert!(store.peek("cold").is_none());
        assert!(store.peek("idle").is_some());
        assert!(store.peek("busy").is_some());
        assert_eq!(store.metrics().evictions(), 1);
    }

    #[test]
    fn test_priority_protects_entry() {
        let store = store();
        let engine = EvictionEngine::new(1, 1);
        let now = Utc::now();

        // Same access figures; low priority loses
        insert_aged(&store, "high", Priority::High, 2, 2, 1, now);
        insert_aged(&store, "low", Priority::Low, 2, 2, 1, now);

        engine.evict_if_needed(&store);
        assert!(store.peek("low").is_none());
        assert!(store.peek("high").is_some());
    }

    #[test]
    fn test_age_penalty_applies() {
        let store = store();
        let engine = EvictionEngine::new(1, 1);
        let now = Utc::now();

        // old: 4*10/1*1.5*0.5 = 30, young: 3*10/1*1.5 = 45
        insert_aged(&store, "old", Priority::Normal, 100, 4, 0, now);
        insert_aged(&store, "young", Priority::Normal, 10, 3, 0, now);

        engine.sweep_at(&store, now);
        assert!(store.peek("old").is_none());
        assert!(store.peek("young").is_some());
    }

    #[test]
    fn test_ties_break_by_access_time_then_insertion() {
        let engine = EvictionEngine::new(10, 1);
        let store = store();
        let now = Utc::now();

        insert_aged(&store, "first", Priority::Normal, 1, 0, 1, now);
        insert_aged(&store, "second", Priority::Normal, 1, 0, 1, now);
        insert_aged(&store, "stalest", Priority::Normal, 5, 0, 5, now);

        let ranked: Vec<String> = engine
            .rank(store.snapshot(), now)
            .iter()
            .map(|e| e.storage_key().to_string())
            .collect();
        assert_eq!(ranked, vec!["stalest", "first", "second"]);
    }

    #[test]
    fn test_batch_bound_leaves_store_over_capacity() {
        let store = store();
        let engine = EvictionEngine::new(2, 1);
        let now = Utc::now();
        for i in 0..6 {
            insert_aged(&store, &format!("k{}", i), Priority::Normal, 1, 0, 1, now);
        }

        let outcome = engine.evict_if_needed(&store).unwrap();
        assert_eq!(outcome.evicted, 1);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_skips_entry_replaced_since_snapshot() {
        let store = store();
        let engine = EvictionEngine::new(0, 1);
        let now = Utc::now();
        insert_aged(&store, "k", Priority::Normal, 1, 0, 1, now);

        let ranked = engine.rank(store.snapshot(), now);
        insert_aged(&store, "k", Priority::Normal, 0, 0, 0, now);

        // Simulate the sweep removal step against the stale candidate
        assert!(!store.remove_entry(&ranked[0]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_trigger_runs_single_sweep() {
        let store = Arc::new(store());
        let engine = Arc::new(EvictionEngine::new(100, 10));
        let now = Utc::now();
        for i in 0..101 {
            insert_aged(&store, &format!("k{}", i), Priority::Normal, 1, 0, 1, now);
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let engine = Arc::clone(&engine);
                thread::spawn(move || engine.evict_if_needed(&store))
            })
            .collect();

        let sweeps = handles
            .into_iter()
            .filter_map(|handle| handle.join().unwrap())
            .count();

        assert_eq!(sweeps, 1);
        assert_eq!(store.len(), 91);
        assert_eq!(store.metrics().evictions(), 10);
    }

    #[test]
    fn test_rank_while_readers_touch_entries() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let store = Arc::new(store());
        let engine = EvictionEngine::new(10, 1);
        let now = Utc::now();
        // Unread entries all score 0, so ordering rests on the tie-breaks
        for i in 0..2000 {
            insert_aged(&store, &format!("k{}", i), Priority::Normal, 1, 0, 1, now);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let readers: Vec<_> = (0..6u64)
            .map(|t| {
                let store = Arc::clone(&store);
                let stop = Arc::clone(&stop);
                thread::spawn(move || {
                    let mut i = t * 331;
                    while !stop.load(Ordering::Relaxed) {
                        if let Some(entry) = store.peek(&format!("k{}", i % 2000)) {
                            entry.record_access_at(Utc::now());
                        }
                        i = i.wrapping_mul(31).wrapping_add(7);
                    }
                })
            })
            .collect();

        for _ in 0..20 {
            let ranked = engine.rank(store.snapshot(), Utc::now());
            assert_eq!(ranked.len(), 2000);
        }

        stop.store(true, Ordering::Relaxed);
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
