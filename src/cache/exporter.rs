//! Prometheus Exposition
//!
//! Mirrors a [`CacheStatistics`] snapshot into a private Prometheus registry
//! and renders it in the text exposition format.

use prometheus::{Encoder, Gauge, IntGauge, Registry, TextEncoder};

use super::metrics::CacheStatistics;
use crate::error::Result;

/// Default metric name prefix
pub const DEFAULT_METRIC_PREFIX: &str = "adaptive_cache";

/// Gauges for every statistics field
pub struct StatisticsExporter {
    registry: Registry,
    total_queries: IntGauge,
    hits: IntGauge,
    misses: IntGauge,
    hit_rate: Gauge,
    current_size: IntGauge,
    max_size: IntGauge,
    evictions: IntGauge,
    unique_patterns: IntGauge,
    popular_entries: IntGauge,
}

impl StatisticsExporter {
    /// Create an exporter with the default prefix
    pub fn new() -> Result<Self> {
        Self::with_prefix(DEFAULT_METRIC_PREFIX)
    }

    /// Create an exporter whose metric names start with `prefix`
    pub fn with_prefix(prefix: &str) -> Result<Self> {
        let registry = Registry::new();

        let int_gauge = |name: &str, help: &str| -> Result<IntGauge> {
            let gauge = IntGauge::new(format!("{}_{}", prefix, name), help)?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };

        let total_queries = int_gauge("queries_total", "Lookups served (hits + misses)")?;
        let hits = int_gauge("hits_total", "Lookups that found a live entry")?;
        let misses = int_gauge("misses_total", "Lookups that found nothing or an expired entry")?;
        let current_size = int_gauge("entries", "Entries currently stored")?;
        let max_size = int_gauge("max_entries", "Configured entry limit")?;
        let evictions = int_gauge("evictions_total", "Entries removed by eviction sweeps")?;
        let unique_patterns = int_gauge("patterns", "Distinct pattern keys tracked")?;
        let popular_entries = int_gauge(
            "popular_patterns",
            "Pattern keys at or above the popularity threshold",
        )?;

        let hit_rate = Gauge::new(format!("{}_hit_rate", prefix), "Hit ratio (0.0 - 1.0)")?;
        registry.register(Box::new(hit_rate.clone()))?;

        Ok(Self {
            registry,
            total_queries,
            hits,
            misses,
            hit_rate,
            current_size,
            max_size,
            evictions,
            unique_patterns,
            popular_entries,
        })
    }

    /// Copy a snapshot into the gauges
    pub fn update(&self, stats: &CacheStatistics) {
        self.total_queries.set(saturating_i64(stats.total_queries));
        self.hits.set(saturating_i64(stats.hits));
        self.misses.set(saturating_i64(stats.misses));
        self.hit_rate.set(stats.hit_rate);
        self.current_size.set(saturating_i64(stats.current_size as u64));
        self.max_size.set(saturating_i64(stats.max_size as u64));
        self.evictions.set(saturating_i64(stats.evictions));
        self.unique_patterns.set(saturating_i64(stats.unique_patterns as u64));
        self.popular_entries.set(saturating_i64(stats.popular_entries as u64));
    }

    /// Encode the registry in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::metrics::CacheMetrics;

    #[test]
    fn test_render_contains_all_gauges() {
        let exporter = StatisticsExporter::new().unwrap();
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_eviction();

        exporter.update(&CacheStatistics::collect(&metrics, 12, 100, 4, 2));
        let text = exporter.render().unwrap();

        assert!(text.contains("adaptive_cache_queries_total 4"));
        assert!(text.contains("adaptive_cache_hits_total 3"));
        assert!(text.contains("adaptive_cache_misses_total 1"));
        assert!(text.contains("adaptive_cache_hit_rate 0.75"));
        assert!(text.contains("adaptive_cache_entries 12"));
        assert!(text.contains("adaptive_cache_max_entries 100"));
        assert!(text.contains("adaptive_cache_evictions_total 1"));
        assert!(text.contains("adaptive_cache_patterns 4"));
        assert!(text.contains("adaptive_cache_popular_patterns 2"));
    }

    #[test]
    fn test_custom_prefix() {
        let exporter = StatisticsExporter::with_prefix("catalog").unwrap();
        let text = exporter.render().unwrap();
        assert!(text.contains("catalog_entries 0"));
        assert!(!text.contains("adaptive_cache_"));
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        assert!(StatisticsExporter::with_prefix("bad prefix").is_err());
    }

    #[test]
    fn test_saturating_i64() {
        assert_eq!(saturating_i64(5), 5);
        assert_eq!(saturating_i64(u64::MAX), i64::MAX);
    }
}
