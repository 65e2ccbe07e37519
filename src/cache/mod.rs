//! Adaptive Cache
//!
//! In-process key/value cache for results of expensive remote lookups.
//! Entry lifetimes adapt to declared priority and to how often a pattern
//! of keys has been written; eviction keeps the store bounded by scoring
//! entries on frequency, recency, priority and age.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          AdaptiveCache                               │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  KeyHasher          │ AccessPatternTracker  │ TtlPolicy              │
//! │  serialize + sha256 │ (DashMap, per-pattern │ popular > priority     │
//! │  → 16 hex chars     │  write counts)        │ > default              │
//! │         │           │          │            │        │               │
//! │         └───────────┴──────────┴────────────┴────────┘               │
//! │                              │                                       │
//! │                EntryStore (DashMap<String, Arc<CacheEntry>>)         │
//! │                              │                                       │
//! │                EvictionEngine (scored, batch-bounded,                │
//! │                one sweep at a time)                                  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Concurrency
//!
//! - Lookups and writes go straight to the sharded map
//! - Access counters are atomics updated in place on hit
//! - Sweeps serialize on a single mutex; writers that lose the race
//!   re-check the size and skip

mod config;
mod entry;
mod eviction;
mod exporter;
mod key;
mod loader;
mod manager;
mod metrics;
mod patterns;
mod policy;
mod store;

mod proptest;

/// Length of a storage key in hex characters
pub const STORAGE_KEY_LEN: usize = 16;

pub use config::{format_duration, parse_duration, CacheConfig};
pub use entry::{CacheEntry, Priority};
pub use eviction::{EvictionEngine, SweepOutcome};
pub use exporter::{StatisticsExporter, DEFAULT_METRIC_PREFIX};
pub use key::{digest, FnKeySerializer, JsonKeySerializer, KeyHasher, KeySerializer};
pub use loader::{FnLoader, Loader};
pub use manager::AdaptiveCache;
pub use metrics::{hit_rate, CacheMetrics, CacheStatistics};
pub use patterns::{normalize_pattern_key, AccessPattern, AccessPatternTracker};
pub use policy::{EvictionPolicy, TtlPolicy};
pub use store::EntryStore;
