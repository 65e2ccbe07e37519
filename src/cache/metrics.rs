//! Cache Metrics Collection
//!
//! Monotonic counters shared by the entry store and the eviction engine, and
//! the point-in-time statistics snapshot built from them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Hit, miss and eviction counters
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    sweeps: AtomicU64,
}

impl CacheMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sweep(&self) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Number of eviction sweeps that ran
    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.sweeps.store(0, Ordering::Relaxed);
    }
}

/// `hits / (hits + misses)`, or 0 when nothing was queried
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatistics {
    /// `hits + misses`
    pub total_queries: u64,
    pub hits: u64,
    pub misses: u64,
    /// Hit ratio (0.0 - 1.0)
    pub hit_rate: f64,
    /// Entries currently stored
    pub current_size: usize,
    /// Configured `max_cache_size`
    pub max_size: usize,
    pub evictions: u64,
    /// Distinct pattern keys seen
    pub unique_patterns: usize,
    /// Pattern keys at or above the popularity threshold
    pub popular_entries: usize,
}

impl CacheStatistics {
    /// Build a snapshot from counters and size figures
    ///
    /// Hits and misses are read once each so `total_queries` always equals
    /// their sum even while other threads keep counting.
    pub fn collect(
        metrics: &CacheMetrics,
        current_size: usize,
        max_size: usize,
        unique_patterns: usize,
        popular_entries: usize,
    ) -> Self {
        let hits = metrics.hits();
        let misses = metrics.misses();

        Self {
            total_queries: hits + misses,
            hits,
            misses,
            hit_rate: hit_rate(hits, misses),
            current_size,
            max_size,
            evictions: metrics.evictions(),
            unique_patterns,
            popular_entries,
        }
    }
}

impl std::fmt::Display for CacheStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Queries:          {}", self.total_queries)?;
        writeln!(f, "Hits:             {}", self.hits)?;
        writeln!(f, "Misses:           {}", self.misses)?;
        writeln!(f, "Hit rate:         {:.2}%", self.hit_rate * 100.0)?;
        writeln!(f, "Size:             {}/{}", self.current_size, self.max_size)?;
        writeln!(f, "Evictions:        {}", self.evictions)?;
        writeln!(f, "Patterns:         {}", self.unique_patterns)?;
        write!(f, "Popular patterns: {}", self.popular_entries)
    }
}

// =============================================================================
// Tests
// =============================================================================
