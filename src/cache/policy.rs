//! TTL and Eviction Policies
//!
//! [`TtlPolicy`] turns a priority and an optional pattern key into a TTL.
//! [`EvictionPolicy`] scores entries for the eviction sweep; lower scores are
//! evicted first.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::config::CacheConfig;
use super::entry::{CacheEntry, Priority};
use super::patterns::AccessPatternTracker;

/// Two-tier TTL resolution
///
/// A pattern key that is already popular overrides the priority entirely and
/// gets `popular_item_ttl`. Otherwise the priority picks its TTL, and an
/// unspecified priority falls back to `default_ttl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    pub default_ttl: Duration,
    pub low_ttl: Duration,
    pub normal_ttl: Duration,
    pub high_ttl: Duration,
    pub popular_ttl: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl TtlPolicy {
    /// Extract the TTL tiers from a cache configuration
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            default_ttl: config.default_ttl,
            low_ttl: config.low_priority_ttl,
            normal_ttl: config.normal_priority_ttl,
            high_ttl: config.high_priority_ttl,
            popular_ttl: config.popular_item_ttl,
        }
    }

    /// TTL bound to a priority alone
    pub fn for_priority(&self, priority: Option<Priority>) -> Duration {
        match priority {
            Some(Priority::Low) => self.low_ttl,
            Some(Priority::Normal) => self.normal_ttl,
            Some(Priority::High) => self.high_ttl,
            None => self.default_ttl,
        }
    }

    /// Resolve the TTL for a write; first match wins
    pub fn resolve(
        &self,
        tracker: &AccessPatternTracker,
        pattern_key: Option<&str>,
        priority: Option<Priority>,
    ) -> Duration {
        match pattern_key {
            Some(key) if tracker.is_popular(key) => self.popular_ttl,
            _ => self.for_priority(priority),
        }
    }
}

/// Hybrid frequency/recency eviction scoring
///
/// ```text
/// base  = access_count * frequency_weight / (recency_hours + 1)
/// score = base * priority_multiplier
/// score *= age_penalty      when age > age_penalty_after
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EvictionPolicy {
    /// Weight of each recorded hit
    pub frequency_weight: f64,
    /// Age beyond which the penalty applies
    pub age_penalty_after: Duration,
    /// Multiplier applied to old entries
    pub age_penalty: f64,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            frequency_weight: 10.0,
            age_penalty_after: Duration::from_secs(72 * 3600),
            age_penalty: 0.5,
        }
    }
}

fn hours_between(earlier: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let micros = (now - earlier).num_microseconds().unwrap_or(i64::MAX);
    (micros.max(0) as f64) / 3_600_000_000.0
}

impl EvictionPolicy {
    /// Score raw entry figures as of `now`
    pub fn score(
        &self,
        access_count: u64,
        priority: Priority,
        created_at: DateTime<Utc>,
        last_accessed: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> f64 {
        let age_hours = hours_between(created_at, now);
        let recency_hours = hours_between(last_accessed, now);

        let base = (access_count as f64 * self.frequency_weight) / (recency_hours + 1.0);
        let mut score = base * priority.eviction_multiplier();

        if age_hours > self.age_penalty_after.as_secs_f64() / 3600.0 {
            score *= self.age_penalty;
        }

        score
    }

    /// Score a stored entry as of `now`
    pub fn score_entry<V>(&self, entry: &CacheEntry<V>, now: DateTime<Utc>) -> f64 {
        self.score(
            entry.access_count(),
            entry.priority(),
            entry.created_at(),
            entry.last_accessed(),
            now,
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn hours_ago(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
        now - ChronoDuration::hours(hours)
    }

    // =========================================================================
    // TtlPolicy
    // =========================================================================

    #[test]
    fn test_ttl_for_priority_defaults() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.for_priority(Some(Priority::Low)), Duration::from_secs(6 * 3600));
        assert_eq!(policy.for_priority(Some(Priority::Normal)), Duration::from_secs(24 * 3600));
        assert_eq!(policy.for_priority(Some(Priority::High)), Duration::from_secs(72 * 3600));
        assert_eq!(policy.for_priority(None), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_ttl_priority_ordering() {
        let policy = TtlPolicy::default();
        let ttl = |priority| policy.for_priority(Some(priority));
        assert!(ttl(Priority::High) > ttl(Priority::Normal));
        assert!(ttl(Priority::Normal) > ttl(Priority::Low));
    }

    #[test]
    fn test_ttl_popular_pattern_overrides_priority() {
        let policy = TtlPolicy::default();
        let tracker = AccessPatternTracker::new(2);
        tracker.record("artist", Priority::Low);

        assert_eq!(
            policy.resolve(&tracker, Some("artist"), Some(Priority::Low)),
            policy.low_ttl
        );

        tracker.record("artist", Priority::Low);
        assert_eq!(
            policy.resolve(&tracker, Some("ARTIST"), Some(Priority::Low)),
            policy.popular_ttl
        );
        assert_eq!(policy.resolve(&tracker, Some("artist"), None), policy.popular_ttl);
    }

    #[test]
    fn test_ttl_without_pattern_uses_priority() {
        let policy = TtlPolicy::default();
        let tracker = AccessPatternTracker::new(1);
        tracker.record("popular", Priority::Normal);

        assert_eq!(policy.resolve(&tracker, None, Some(Priority::High)), policy.high_ttl);
        assert_eq!(
            policy.resolve(&tracker, Some("other"), Some(Priority::High)),
            policy.high_ttl
        );
    }

    #[test]
    fn test_ttl_resolution_does_not_record() {
        let policy = TtlPolicy::default();
        let tracker = AccessPatternTracker::new(1);
        policy.resolve(&tracker, Some("p"), Some(Priority::Normal));
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn test_ttl_from_config() {
        let config = CacheConfig {
            low_priority_ttl: Duration::from_secs(1),
            popular_item_ttl: Duration::from_secs(99),
            ..Default::default()
        };
        let policy = TtlPolicy::from_config(&config);
        assert_eq!(policy.low_ttl, Duration::from_secs(1));
        assert_eq!(policy.popular_ttl, Duration::from_secs(99));
    }

    // =========================================================================
    // EvictionPolicy
    // =========================================================================

    #[test]
    fn test_score_unaccessed_is_zero() {
        let policy = EvictionPolicy::default();
        let now = Utc::now();
        assert_eq!(policy.score(0, Priority::High, now, now, now), 0.0);
    }

    #[test]
    fn test_score_formula() {
        let policy = EvictionPolicy::default();
        let now = Utc::now();

        // 4 hits, last one 1h ago: 40 / 2 = 20, normal => 30
        let score = policy.score(4, Priority::Normal, hours_ago(now, 2), hours_ago(now, 1), now);
        assert!((score - 30.0).abs() < 1e-9);

        // Same figures at high priority => 60
        let score = policy.score(4, Priority::High, hours_ago(now, 2), hours_ago(now, 1), now);
        assert!((score - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_recency_penalty() {
        let policy = EvictionPolicy::default();
        let now = Utc::now();
        let created = hours_ago(now, 10);

        let recent = policy.score(5, Priority::Normal, created, now, now);
        let stale = policy.score(5, Priority::Normal, created, hours_ago(now, 9), now);
        assert!(recent > stale);
    }

    #[test]
    fn test_score_age_penalty() {
        let policy = EvictionPolicy::default();
        let now = Utc::now();

        let young = policy.score(3, Priority::High, hours_ago(now, 72), now, now);
        let old = policy.score(3, Priority::High, hours_ago(now, 73), now, now);

        assert!((young - 90.0).abs() < 1e-9);
        // 3x boost and 0.5x penalty combine to 1.5x
        assert!((old - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_entry_matches_raw_score() {
        let policy = EvictionPolicy::default();
        let now = Utc::now();
        let entry = CacheEntry::new(
            "k",
            (),
            Priority::Low,
            Duration::from_secs(3600),
            hours_ago(now, 1),
        );
        entry.record_access_at(now);
        entry.record_access_at(now);

        let expected = policy.score(
            2,
            Priority::Low,
            entry.created_at(),
            entry.last_accessed(),
            now,
        );
        assert_eq!(policy.score_entry(&entry, now), expected);
        assert!((expected - 20.0).abs() < 1e-6);
    }
}
