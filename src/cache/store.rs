//! Entry Store
//!
//! Concurrent map from storage key to shared entries. Built on `DashMap`, so
//! reads never block on other reads or on writes to keys in other shards.
//!
//! Entries are stored behind `Arc`: a lookup clones the pointer out of the
//! shard guard and releases the guard before touching the entry, and an
//! upsert swaps the pointer, so readers only ever see whole entries.
//!
//! [`EntryStore::snapshot`] is weakly consistent: it visits one shard at a
//! time under that shard's read lock, so it may miss or include writes that
//! race with the scan but never blocks readers for the whole pass.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tracing::trace;

use super::entry::CacheEntry;
use super::metrics::CacheMetrics;

/// Concurrent storage for cache entries
pub struct EntryStore<V> {
    entries: DashMap<String, Arc<CacheEntry<V>>>,
    metrics: Arc<CacheMetrics>,
    next_sequence: AtomicU64,
}

impl<V> EntryStore<V> {
    /// Create an empty store reporting into `metrics`
    pub fn new(metrics: Arc<CacheMetrics>) -> Self {
        Self {
            entries: DashMap::new(),
            metrics,
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Look up a live entry, recording exactly one hit or miss
    ///
    /// An expired entry is removed and reported as a miss. A hit bumps the
    /// entry's access count and last-accessed time.
    pub fn try_get(&self, storage_key: &str) -> Option<V>
    where
        V: Clone,
    {
        self.try_get_entry(storage_key)
            .map(|entry| entry.value().clone())
    }

    /// Like [`try_get`](Self::try_get) but returns the shared entry
    pub fn try_get_entry(&self, storage_key: &str) -> Option<Arc<CacheEntry<V>>> {
        let now = Utc::now();
        let found = self
            .entries
            .get(storage_key)
            .map(|guard| Arc::clone(guard.value()));

        match found {
            Some(entry) if entry.is_expired_at(now) => {
                self.remove_entry(&entry);
                self.metrics.record_miss();
                trace!(storage_key, "removed expired entry");
                None
            }
            Some(entry) => {
                entry.record_access_at(now);
                self.metrics.record_hit();
                Some(entry)
            }
            None => {
                self.metrics.record_miss();
                None
            }
        }
    }

    /// Peek at an entry without touching counters or access bookkeeping
    pub fn peek(&self, storage_key: &str) -> Option<Arc<CacheEntry<V>>> {
        self.entries
            .get(storage_key)
            .map(|guard| Arc::clone(guard.value()))
    }

    /// Insert or fully replace an entry; last writer wins
    pub fn upsert(&self, entry: CacheEntry<V>) -> Option<Arc<CacheEntry<V>>> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let entry = entry.with_sequence(sequence);
        self.entries
            .insert(entry.storage_key().to_string(), Arc::new(entry))
    }

    /// Remove by key, returning whether anything was present
    pub fn remove(&self, storage_key: &str) -> bool {
        self.entries.remove(storage_key).is_some()
    }

    /// Remove `entry` only if it is still the one stored under its key
    ///
    /// Returns false when the key was removed or replaced concurrently.
    pub fn remove_entry(&self, entry: &Arc<CacheEntry<V>>) -> bool {
        self.entries
            .remove_if(entry.storage_key(), |_, current| Arc::ptr_eq(current, entry))
            .is_some()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weakly consistent copy of all entries
    pub fn snapshot(&self) -> Vec<Arc<CacheEntry<V>>> {
        self.entries
            .iter()
            .map(|guard| Arc::clone(guard.value()))
            .collect()
    }

    pub(crate) fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::Priority;
    use std::thread;
    use std::time::Duration;

    fn store() -> EntryStore<String> {
        EntryStore::new(Arc::new(CacheMetrics::new()))
    }

    fn entry(key: &str, value: &str, ttl: Duration) -> CacheEntry<String> {
        CacheEntry::new(key, value.to_string(), Priority::Normal, ttl, Utc::now())
    }

    #[test]
    fn test_store_upsert_get() {
        let store = store();
        assert!(store.is_empty());

        store.upsert(entry("k1", "v1", Duration::from_secs(60)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.try_get("k1"), Some("v1".to_string()));
        assert_eq!(store.metrics().hits(), 1);
        assert_eq!(store.metrics().misses(), 0);
    }

    #[test]
    fn test_store_miss_counts_once() {
        let store = store();
        assert_eq!(store.try_get("missing"), None);
        assert_eq!(store.metrics().misses(), 1);
        assert_eq!(store.metrics().hits(), 0);
    }

    #[test]
    fn test_store_expired_entry_removed_on_read() {
        let store = store();
        store.upsert(entry("k1", "v1", Duration::ZERO));
        thread::sleep(Duration::from_millis(2));

        assert_eq!(store.try_get("k1"), None);
        assert!(store.is_empty());
        assert_eq!(store.metrics().misses(), 1);
        assert_eq!(store.metrics().hits(), 0);
    }

    #[test]
    fn test_store_replace_resets_access_count() {
        let store = store();
        store.upsert(entry("k1", "old", Duration::from_secs(60)));
        store.try_get("k1");
        store.try_get("k1");
        assert_eq!(store.peek("k1").unwrap().access_count(), 2);

        let previous = store.upsert(entry("k1", "new", Duration::from_secs(60)));
        assert_eq!(previous.unwrap().value(), "old");
        assert_eq!(store.len(), 1);

        let current = store.peek("k1").unwrap();
        assert_eq!(current.value(), "new");
        assert_eq!(current.access_count(), 0);
    }

    #[test]
    fn test_store_sequence_increases() {
        let store = store();
        store.upsert(entry("a", "1", Duration::from_secs(60)));
        store.upsert(entry("b", "2", Duration::from_secs(60)));
        let a = store.peek("a").unwrap().sequence();
        let b = store.peek("b").unwrap().sequence();
        assert!(a < b);
    }

    #[test]
    fn test_store_remove() {
        let store = store();
        store.upsert(entry("k1", "v1", Duration::from_secs(60)));
        assert!(store.remove("k1"));
        assert!(!store.remove("k1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_remove_entry_skips_replaced() {
        let store = store();
        store.upsert(entry("k1", "old", Duration::from_secs(60)));
        let stale = store.peek("k1").unwrap();
        store.upsert(entry("k1", "new", Duration::from_secs(60)));

        assert!(!store.remove_entry(&stale));
        assert_eq!(store.peek("k1").unwrap().value(), "new");

        let current = store.peek("k1").unwrap();
        assert!(store.remove_entry(&current));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_peek_does_not_count() {
        let store = store();
        store.upsert(entry("k1", "v1", Duration::from_secs(60)));
        store.peek("k1");
        store.peek("missing");
        assert_eq!(store.metrics().hits(), 0);
        assert_eq!(store.metrics().misses(), 0);
        assert_eq!(store.peek("k1").unwrap().access_count(), 0);
    }

    #[test]
    fn test_store_snapshot_and_clear() {
        let store = store();
        for i in 0..50 {
            store.upsert(entry(&format!("k{}", i), "v", Duration::from_secs(60)));
        }
        assert_eq!(store.snapshot().len(), 50);

        store.clear();
        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_store_concurrent_readers_and_writers() {
        let store = Arc::new(store());
        store.upsert(entry("shared", "v", Duration::from_secs(60)));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("k-{}-{}", t, i);
                        store.upsert(entry(&key, "v", Duration::from_secs(60)));
                        store.try_get("shared");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 4001);
        assert_eq!(store.peek("shared").unwrap().access_count(), 4000);
        assert_eq!(store.metrics().hits(), 4000);
    }
}
