//! Adaptive Cache - Popularity-Aware In-Process Caching
//!
//! An in-memory key/value cache that sits in front of expensive remote
//! lookups (rate-limited third-party APIs, slow catalogs). Entry lifetimes
//! adapt to a declared priority and to how often a pattern of keys has been
//! written; a scored eviction sweep keeps the store bounded.
//!
//! # Architecture
//!
//! ```text
//! caller ──▶ AdaptiveCache ──▶ KeyHasher ──▶ EntryStore (DashMap)
//!                 │                               │
//!                 ├──▶ AccessPatternTracker       └──▶ EvictionEngine
//!                 ├──▶ TtlPolicy
//!                 └──▶ Loader (on miss, via get_or_load)
//! ```
//!
//! # Example
//!
//! ```
//! use adaptive_cache::{AdaptiveCache, CacheConfig, Priority};
//!
//! let cache = AdaptiveCache::<String>::new(CacheConfig::default())?;
//! cache.set("artist:42", "Nina Simone".to_string(), Priority::High, Some("artist"))?;
//! assert_eq!(cache.try_get("artist:42")?, Some("Nina Simone".to_string()));
//! # Ok::<(), adaptive_cache::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`cache`] - The cache and its components
//! - [`error`] - Error types
//! - [`simulation`] - Deterministic workload simulator

pub mod cache;
pub mod error;
pub mod simulation;

// Re-export commonly used types
pub use cache::{
    AdaptiveCache, CacheConfig, CacheStatistics, FnKeySerializer, FnLoader, JsonKeySerializer,
    KeySerializer, Loader, Priority, StatisticsExporter,
};
pub use error::{Error, Result};
pub use simulation::{RemoteCatalog, SimulationReport, Workload};
