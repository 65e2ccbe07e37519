//! Workload Simulator
//!
//! Drives an [`AdaptiveCache`] with a deterministic mix of hot and cold
//! lookups in front of a slow remote catalog, and reports how many remote
//! calls the cache saved.
//!
//! # Request Plan
//!
//! ```text
//! request i ──▶ i % 100 < hot_ratio * 100 ?
//!                 ├─ yes: hot key  (i % hot_keys), High priority, pattern "group:<k % groups>"
//!                 └─ no:  cold key (hot_keys + i % cold_keys), Low priority, no pattern
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{AdaptiveCache, CacheStatistics, KeySerializer, Loader, Priority};
use crate::error::{Error, Result};

/// Shape of a simulated workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    /// Total lookups to issue
    pub requests: u64,
    /// Distinct frequently requested keys
    pub hot_keys: u64,
    /// Distinct rarely requested keys
    pub cold_keys: u64,
    /// Share of requests that target hot keys (0.0 - 1.0)
    pub hot_ratio: f64,
    /// Lookups in flight at once
    pub concurrency: usize,
    /// Simulated latency of one remote call
    pub fetch_latency: Duration,
    /// Number of pattern keys the hot keys are grouped under
    pub pattern_groups: u64,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            requests: 10_000,
            hot_keys: 100,
            cold_keys: 5_000,
            hot_ratio: 0.8,
            concurrency: 16,
            fetch_latency: Duration::from_millis(2),
            pattern_groups: 10,
        }
    }
}

/// One planned lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRequest {
    pub key: u64,
    pub priority: Priority,
    pub pattern_key: Option<String>,
}

impl Workload {
    /// Validate workload parameters
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.hot_ratio) {
            return Err(Error::Config(format!(
                "hot_ratio must be within 0.0 - 1.0, got {}",
                self.hot_ratio
            )));
        }
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be > 0".into()));
        }
        if self.hot_keys == 0 && self.cold_keys == 0 {
            return Err(Error::Config("workload needs at least one key".into()));
        }
        if self.hot_keys > 0 && self.pattern_groups == 0 {
            return Err(Error::Config("pattern_groups must be > 0".into()));
        }
        Ok(())
    }

    /// The lookup issued as request `index`
    pub fn request(&self, index: u64) -> PlannedRequest {
        let hot_slots = (self.hot_ratio * 100.0).round() as u64;
        let is_hot = match (self.hot_keys, self.cold_keys) {
            (0, _) => false,
            (_, 0) => true,
            _ => index % 100 < hot_slots,
        };

        if is_hot {
            let key = index % self.hot_keys;
            PlannedRequest {
                key,
                priority: Priority::High,
                pattern_key: Some(format!("group:{}", key % self.pattern_groups.max(1))),
            }
        } else {
            PlannedRequest {
                key: self.hot_keys + index % self.cold_keys.max(1),
                priority: Priority::Low,
                pattern_key: None,
            }
        }
    }
}

// =============================================================================
// Remote Catalog
// =============================================================================

/// Stand-in for a slow, rate-limited catalog service
#[derive(Debug, Default)]
pub struct RemoteCatalog {
    latency: Duration,
    calls: AtomicU64,
}

impl RemoteCatalog {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            calls: AtomicU64::new(0),
        }
    }

    /// Remote calls made so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Loader<u64, String> for RemoteCatalog {
    async fn load(&self, key: &u64) -> Result<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(format!("catalog-item-{}", key))
    }
}

// =============================================================================
// Run
// =============================================================================

/// Outcome of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Lookups issued
    pub requests: u64,
    /// Lookups that reached the remote catalog
    pub remote_calls: u64,
    /// Lookups answered without a remote call
    pub remote_calls_saved: u64,
    /// Wall time of the run
    pub elapsed_ms: u64,
    /// Cache statistics at the end of the run
    pub statistics: CacheStatistics,
}

impl std::fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Requests:         {}", self.requests)?;
        writeln!(f, "Remote calls:     {}", self.remote_calls)?;
        writeln!(f, "Calls saved:      {}", self.remote_calls_saved)?;
        writeln!(f, "Elapsed:          {} ms", self.elapsed_ms)?;
        write!(f, "{}", self.statistics)
    }
}

/// Issue every request of `workload` through `cache`, loading misses from `remote`
///
/// At most `workload.concurrency` lookups are in flight. The first loader
/// error aborts the run.
pub async fn run<S>(
    cache: &AdaptiveCache<String, S>,
    workload: &Workload,
    remote: &RemoteCatalog,
) -> Result<SimulationReport>
where
    S: KeySerializer<u64>,
{
    workload.validate()?;

    let started = Instant::now();
    let calls_before = remote.calls();

    let mut lookups = stream::iter(0..workload.requests)
        .map(|index| {
            let request = workload.request(index);
            async move {
                cache
                    .get_or_load(
                        &request.key,
                        request.priority,
                        request.pattern_key.as_deref(),
                        remote,
                    )
                    .await
            }
        })
        .buffer_unordered(workload.concurrency);

    while let Some(result) = lookups.next().await {
        result?;
    }

    let remote_calls = remote.calls() - calls_before;
    let elapsed = started.elapsed();

    debug!(
        requests = workload.requests,
        remote_calls,
        elapsed_ms = elapsed.as_millis() as u64,
        "simulation finished"
    );

    Ok(SimulationReport {
        requests: workload.requests,
        remote_calls,
        remote_calls_saved: workload.requests.saturating_sub(remote_calls),
        elapsed_ms: elapsed.as_millis() as u64,
        statistics: cache.get_statistics(),
    })
}

// =============================================================================
// Tests
// =============================================================================
