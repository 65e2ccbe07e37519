//! Property-Based Tests for the Adaptive Cache
//!
//! # Test Properties
//!
//! 1. **Roundtrip**: a value written is read back until evicted or expired
//! 2. **Statistics**: `total_queries == hits + misses` for any workload
//! 3. **Bounded Size**: sequential writes never leave more than `max_cache_size` entries
//! 4. **TTL Ordering**: high >= normal >= low for any valid configuration
//! 5. **Storage Keys**: deterministic and fixed length

#![cfg(test)]

use std::time::Duration;

use proptest::prelude::*;

use super::config::{format_duration, parse_duration, CacheConfig};
use super::entry::Priority;
use super::key::digest;
use super::manager::AdaptiveCache;
use super::policy::TtlPolicy;
use super::STORAGE_KEY_LEN;

// =============================================================================
// Property Strategies
// =============================================================================

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Normal),
        Just(Priority::High),
    ]
}

/// Small limits so sweeps happen often
fn limits_strategy() -> impl Strategy<Value = (usize, usize)> {
    (1usize..=32, 1usize..=8)
}

/// Operations against a small key space: (is_write, key, priority)
fn ops_strategy() -> impl Strategy<Value = Vec<(bool, u8, Priority)>> {
    prop::collection::vec((any::<bool>(), 0u8..16, priority_strategy()), 1..200)
}

/// Whole seconds from 1s to ~10 days
fn duration_strategy() -> impl Strategy<Value = Duration> {
    (1u64..864_000).prop_map(Duration::from_secs)
}

// =============================================================================
// Cache Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: a value written without eviction pressure is read back unchanged.
    #[test]
    fn prop_roundtrip(
        key in ".{0,40}",
        value in any::<u64>(),
        priority in priority_strategy(),
    ) {
        let cache = AdaptiveCache::<u64>::new(CacheConfig::default())?;
        cache.set(&key, value, priority, None)?;
        prop_assert_eq!(cache.try_get(&key)?, Some(value));
    }

    /// Property: query totals always reconcile.
    #[test]
    fn prop_statistics_consistent(
        (max, batch) in limits_strategy(),
        ops in ops_strategy(),
    ) {
        let cache = AdaptiveCache::<u8>::new(CacheConfig {
            max_cache_size: max,
            eviction_batch_size: batch,
            ..Default::default()
        })?;

        let mut reads = 0u64;
        for (is_write, key, priority) in ops {
            if is_write {
                cache.set(&key, key, priority, Some("group"))?;
            } else {
                cache.try_get(&key)?;
                reads += 1;
            }
        }

        let stats = cache.get_statistics();
        prop_assert_eq!(stats.total_queries, stats.hits + stats.misses);
        prop_assert_eq!(stats.total_queries, reads);
        prop_assert!(stats.hit_rate >= 0.0 && stats.hit_rate <= 1.0);
        prop_assert!(stats.unique_patterns <= 1);
    }

    /// Property: single-threaded writes never leave the cache over capacity,
    /// and every missing key was counted as an eviction.
    #[test]
    fn prop_size_bounded(
        (max, batch) in limits_strategy(),
        writes in 1usize..150,
    ) {
        let cache = AdaptiveCache::<usize>::new(CacheConfig {
            max_cache_size: max,
            eviction_batch_size: batch,
            ..Default::default()
        })?;

        for i in 0..writes {
            cache.insert(&i, i)?;
            prop_assert!(cache.len() <= max);
        }

        let stats = cache.get_statistics();
        prop_assert_eq!(stats.evictions as usize, writes - cache.len());
    }

    /// Property: priority TTLs keep their ordering whenever the configured tiers do.
    #[test]
    fn prop_ttl_priority_ordering(
        low in duration_strategy(),
        normal_extra in 0u64..100_000,
        high_extra in 0u64..100_000,
    ) {
        let normal = low + Duration::from_secs(normal_extra);
        let high = normal + Duration::from_secs(high_extra);
        let policy = TtlPolicy::from_config(&CacheConfig {
            low_priority_ttl: low,
            normal_priority_ttl: normal,
            high_priority_ttl: high,
            ..Default::default()
        });

        let ttl = |priority| policy.for_priority(Some(priority));
        prop_assert!(ttl(Priority::High) >= ttl(Priority::Normal));
        prop_assert!(ttl(Priority::Normal) >= ttl(Priority::Low));
    }
}

// =============================================================================
// Key and Duration Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: storage keys are stable lowercase hex of fixed length.
    #[test]
    fn prop_digest_deterministic(input in ".*") {
        let a = digest(&input);
        let b = digest(&input);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.len(), STORAGE_KEY_LEN);
        prop_assert!(a.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    /// Property: formatted durations parse back to the same value.
    #[test]
    fn prop_duration_format_parse(duration in duration_strategy()) {
        let text = format_duration(duration);
        prop_assert_eq!(parse_duration(&text)?, duration);
    }
}
