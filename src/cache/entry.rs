//! Cache Entry Types
//!
//! An entry is immutable apart from its access bookkeeping, which is kept in
//! atomics so concurrent readers never lose an increment. Replacing a value
//! swaps the whole entry; fields are never rewritten in place.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-assigned retention hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Cheap to refetch
    Low,
    /// Default
    #[default]
    Normal,
    /// Expensive or rate-limited to refetch
    High,
}

impl Priority {
    /// Weight applied to the eviction score
    pub fn eviction_multiplier(&self) -> f64 {
        match self {
            Priority::High => 3.0,
            Priority::Normal => 1.5,
            Priority::Low => 1.0,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
        }
    }
}

/// Add a TTL to a timestamp, saturating at the maximum representable instant
pub(crate) fn expiry_after(created_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| created_at.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A cached value with its timestamps and access bookkeeping
#[derive(Debug)]
pub struct CacheEntry<V> {
    storage_key: String,
    value: V,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    /// Microseconds since the Unix epoch
    last_accessed: AtomicI64,
    priority: Priority,
    access_count: AtomicU64,
    /// Insertion order, used to break eviction ties
    sequence: u64,
}

impl<V> CacheEntry<V> {
    /// Create an entry expiring `ttl` after `created_at`
    pub fn new(
        storage_key: impl Into<String>,
        value: V,
        priority: Priority,
        ttl: Duration,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            storage_key: storage_key.into(),
            value,
            created_at,
            expires_at: expiry_after(created_at, ttl),
            last_accessed: AtomicI64::new(created_at.timestamp_micros()),
            priority,
            access_count: AtomicU64::new(0),
            sequence: 0,
        }
    }

    pub(crate) fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Storage key this entry lives under
    #[inline]
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Cached value
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    #[inline]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Hits since insertion
    #[inline]
    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    /// Last successful lookup, or the insertion time if never read
    pub fn last_accessed(&self) -> DateTime<Utc> {
        let micros = self.last_accessed.load(Ordering::Relaxed);
        DateTime::from_timestamp_micros(micros).unwrap_or(self.created_at)
    }

    /// Visible while `now <= expires_at`
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Record a hit and return the new access count
    pub fn record_access_at(&self, now: DateTime<Utc>) -> u64 {
        self.last_accessed
            .fetch_max(now.timestamp_micros(), Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Time left before expiry, zero once expired
    pub fn remaining_ttl_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or_default()
    }
}

// =============================================================================
// Tests
// =============================================================================
