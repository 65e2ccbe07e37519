//! Adaptive Cache - Public Facade
//!
//! Wires the key hasher, entry store, pattern tracker, TTL policy and
//! eviction engine together. All work runs synchronously on the calling
//! thread; the only lock is the eviction sweep lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use super::config::CacheConfig;
use super::entry::{CacheEntry, Priority};
use super::eviction::EvictionEngine;
use super::key::{JsonKeySerializer, KeyHasher, KeySerializer};
use super::loader::Loader;
use super::metrics::{CacheMetrics, CacheStatistics};
use super::patterns::{normalize_pattern_key, AccessPattern, AccessPatternTracker};
use super::policy::TtlPolicy;
use super::store::EntryStore;
use crate::error::Result;

/// In-process cache with popularity-driven TTLs and scored eviction
///
/// Keys of any type are accepted as long as the serializer `S` can turn them
/// into a string; values are cloned out on every hit, so wrap expensive
/// values in an `Arc`.
pub struct AdaptiveCache<V, S = JsonKeySerializer> {
    config: CacheConfig,
    hasher: KeyHasher<S>,
    store: EntryStore<V>,
    patterns: AccessPatternTracker,
    ttl_policy: TtlPolicy,
    eviction: EvictionEngine,
    metrics: Arc<CacheMetrics>,
}

impl<V> AdaptiveCache<V, JsonKeySerializer> {
    /// Create a cache that serializes keys as JSON
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_serializer(config, JsonKeySerializer)
    }
}

impl<V, S> AdaptiveCache<V, S> {
    /// Create a cache with a custom key serializer
    ///
    /// Fails if the configuration is invalid.
    pub fn with_serializer(config: CacheConfig, serializer: S) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(CacheMetrics::new());
        let cache = Self {
            hasher: KeyHasher::new(serializer),
            store: EntryStore::new(Arc::clone(&metrics)),
            patterns: AccessPatternTracker::new(config.popularity_threshold),
            ttl_policy: TtlPolicy::from_config(&config),
            eviction: EvictionEngine::new(config.max_cache_size, config.eviction_batch_size),
            metrics,
            config,
        };

        debug!(
            max_cache_size = cache.config.max_cache_size,
            eviction_batch_size = cache.config.eviction_batch_size,
            popularity_threshold = cache.config.popularity_threshold,
            low_ttl = ?cache.ttl_policy.low_ttl,
            normal_ttl = ?cache.ttl_policy.normal_ttl,
            high_ttl = ?cache.ttl_policy.high_ttl,
            popular_ttl = ?cache.ttl_policy.popular_ttl,
            "adaptive cache created"
        );

        Ok(cache)
    }

    /// Look up a value; expired entries are removed and reported as misses
    pub fn try_get<K: ?Sized>(&self, key: &K) -> Result<Option<V>>
    where
        S: KeySerializer<K>,
        V: Clone,
    {
        let storage_key = self.hasher.hash(key)?;
        Ok(self.store.try_get(&storage_key))
    }

    /// Store a value with a priority and an optional pattern key
    ///
    /// The TTL is resolved before the pattern is recorded, so the write that
    /// makes a pattern popular still gets its priority TTL; later writes get
    /// `popular_item_ttl`.
    pub fn set<K: ?Sized>(
        &self,
        key: &K,
        value: V,
        priority: Priority,
        pattern_key: Option<&str>,
    ) -> Result<()>
    where
        S: KeySerializer<K>,
    {
        let storage_key = self.hasher.hash(key)?;
        self.store_resolved(storage_key, value, Some(priority), pattern_key);
        Ok(())
    }

    /// Store a value without a priority; the TTL is `default_ttl`
    pub fn insert<K: ?Sized>(&self, key: &K, value: V) -> Result<()>
    where
        S: KeySerializer<K>,
    {
        let storage_key = self.hasher.hash(key)?;
        self.store_resolved(storage_key, value, None, None);
        Ok(())
    }

    /// Store a value with an explicit TTL, bypassing priority and pattern rules
    pub fn set_with_ttl<K: ?Sized>(&self, key: &K, value: V, ttl: Duration) -> Result<()>
    where
        S: KeySerializer<K>,
    {
        let storage_key = self.hasher.hash(key)?;
        self.store_entry(storage_key, value, Priority::Normal, ttl);
        Ok(())
    }

    /// Remove a key, returning whether it was present
    pub fn remove<K: ?Sized>(&self, key: &K) -> Result<bool>
    where
        S: KeySerializer<K>,
    {
        let storage_key = self.hasher.hash(key)?;
        Ok(self.store.remove(&storage_key))
    }

    /// Whether a live entry exists; not counted as a query
    pub fn contains_key<K: ?Sized>(&self, key: &K) -> Result<bool>
    where
        S: KeySerializer<K>,
    {
        Ok(self.peek_entry(key)?.is_some_and(|entry| !entry.is_expired()))
    }

    /// Inspect the stored entry without counting a query or an access
    pub fn peek_entry<K: ?Sized>(&self, key: &K) -> Result<Option<Arc<CacheEntry<V>>>>
    where
        S: KeySerializer<K>,
    {
        let storage_key = self.hasher.hash(key)?;
        Ok(self.store.peek(&storage_key))
    }

    /// Return the cached value, or load, store and return it on a miss
    ///
    /// Loader errors propagate and nothing is stored. Concurrent misses on
    /// the same key each call the loader; the last write wins.
    pub async fn get_or_load<K, L>(
        &self,
        key: &K,
        priority: Priority,
        pattern_key: Option<&str>,
        loader: &L,
    ) -> Result<V>
    where
        K: ?Sized,
        S: KeySerializer<K>,
        L: Loader<K, V> + ?Sized,
        V: Clone,
    {
        let storage_key = self.hasher.hash(key)?;
        if let Some(value) = self.store.try_get(&storage_key) {
            return Ok(value);
        }

        let value = loader.load(key).await?;
        self.store_resolved(storage_key, value.clone(), Some(priority), pattern_key);
        Ok(value)
    }

    /// Drop all entries and patterns and reset every counter
    pub fn clear(&self) {
        self.eviction.exclusive(|| {
            self.store.clear();
            self.patterns.clear();
            self.metrics.reset();
        });
        debug!("adaptive cache cleared");
    }

    /// Whether a pattern key has reached the popularity threshold
    pub fn is_popular_pattern(&self, pattern_key: &str) -> bool {
        self.patterns.is_popular(pattern_key)
    }

    /// Write statistics for a pattern key
    pub fn pattern(&self, pattern_key: &str) -> Option<AccessPattern> {
        self.patterns.get(pattern_key)
    }

    /// Point-in-time statistics; scans the pattern tracker
    pub fn get_statistics(&self) -> CacheStatistics {
        CacheStatistics::collect(
            &self.metrics,
            self.store.len(),
            self.config.max_cache_size,
            self.patterns.count(),
            self.patterns.popular_count(self.config.popularity_threshold),
        )
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Resolve the TTL, record the pattern, then store
    fn store_resolved(
        &self,
        storage_key: String,
        value: V,
        priority: Option<Priority>,
        pattern_key: Option<&str>,
    ) {
        let pattern_key = pattern_key.and_then(normalize_pattern_key);
        let ttl = self
            .ttl_policy
            .resolve(&self.patterns, pattern_key.as_deref(), priority);

        let priority = priority.unwrap_or_default();
        if let Some(pattern_key) = pattern_key.as_deref() {
            self.patterns.record(pattern_key, priority);
        }

        self.store_entry(storage_key, value, priority, ttl);
    }

    fn store_entry(&self, storage_key: String, value: V, priority: Priority, ttl: Duration) {
        let entry = CacheEntry::new(storage_key, value, priority, ttl, Utc::now());
        self.store.upsert(entry);
        self.eviction.evict_if_needed(&self.store);
    }
}

impl<V, S> std::fmt::Debug for AdaptiveCache<V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveCache")
            .field("config", &self.config)
            .field("len", &self.store.len())
            .field("patterns", &self.patterns.count())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
