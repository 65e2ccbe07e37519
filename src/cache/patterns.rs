//! Access Pattern Tracker
//!
//! Counts writes per pattern key. A pattern key is coarser than a cache key
//! (e.g. every search for one artist) and is normalized by trimming and
//! lowercasing. Popularity measures how often a pattern is *written*, i.e.
//! refetched and stored again, not how often it is read.
//!
//! Patterns never decay; the tracker only shrinks on [`AccessPatternTracker::clear`].

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::entry::Priority;

/// Normalize a pattern key, returning `None` for blank keys
pub fn normalize_pattern_key(pattern_key: &str) -> Option<String> {
    let trimmed = pattern_key.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Aggregated write statistics for one pattern key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPattern {
    /// Normalized pattern key
    pub pattern_key: String,
    /// Priority of the most recent write
    pub priority: Priority,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Number of writes recorded against this pattern
    pub access_frequency: u64,
}

impl AccessPattern {
    fn first(pattern_key: String, priority: Priority, now: DateTime<Utc>) -> Self {
        Self {
            pattern_key,
            priority,
            first_seen: now,
            last_seen: now,
            access_frequency: 1,
        }
    }

    fn touch(&mut self, priority: Priority, now: DateTime<Utc>) {
        self.access_frequency += 1;
        self.last_seen = now;
        self.priority = priority;
    }

    /// Whether the write count has reached `threshold`
    pub fn is_popular(&self, threshold: u64) -> bool {
        self.access_frequency >= threshold
    }
}

/// Concurrent map of pattern key to [`AccessPattern`]
pub struct AccessPatternTracker {
    patterns: DashMap<String, AccessPattern>,
    popularity_threshold: u64,
}

impl AccessPatternTracker {
    /// Create a tracker that treats `popularity_threshold` writes as popular
    pub fn new(popularity_threshold: u64) -> Self {
        Self {
            patterns: DashMap::new(),
            popularity_threshold,
        }
    }

    /// Record one write against a pattern and return its new frequency
    ///
    /// Blank pattern keys are ignored and return 0.
    pub fn record(&self, pattern_key: &str, priority: Priority) -> u64 {
        let Some(key) = normalize_pattern_key(pattern_key) else {
            return 0;
        };
        let now = Utc::now();

        let frequency = self
            .patterns
            .entry(key.clone())
            .and_modify(|pattern| pattern.touch(priority, now))
            .or_insert_with(|| AccessPattern::first(key.clone(), priority, now))
            .access_frequency;

        if frequency == self.popularity_threshold {
            trace!(pattern_key = %key, frequency, "pattern became popular");
        }

        frequency
    }

    /// Whether a pattern has been written at least the threshold number of times
    pub fn is_popular(&self, pattern_key: &str) -> bool {
        normalize_pattern_key(pattern_key)
            .and_then(|key| {
                self.patterns
                    .get(&key)
                    .map(|pattern| pattern.is_popular(self.popularity_threshold))
            })
            .unwrap_or(false)
    }

    /// Copy of a pattern's statistics
    pub fn get(&self, pattern_key: &str) -> Option<AccessPattern> {
        let key = normalize_pattern_key(pattern_key)?;
        self.patterns.get(&key).map(|pattern| pattern.clone())
    }

    /// Number of distinct patterns
    pub fn count(&self) -> usize {
        self.patterns.len()
    }

    /// Number of patterns with at least `threshold` writes; scans every pattern
    pub fn popular_count(&self, threshold: u64) -> usize {
        self.patterns
            .iter()
            .filter(|pattern| pattern.is_popular(threshold))
            .count()
    }

    /// Forget every pattern
    pub fn clear(&self) {
        self.patterns.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
