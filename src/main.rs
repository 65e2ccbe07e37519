//! Adaptive Cache Simulator
//!
//! Runs a deterministic hot/cold workload through the adaptive cache in
//! front of a simulated slow catalog and prints the outcome.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │   Workload   │───▶│ AdaptiveCache│───▶│RemoteCatalog │
//! │  (requests)  │    │ (get_or_load)│    │ (on miss)    │
//! └──────────────┘    └──────────────┘    └──────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adaptive_cache::simulation::{self, RemoteCatalog, Workload};
use adaptive_cache::{AdaptiveCache, CacheConfig, Result, StatisticsExporter};

// =============================================================================
// CLI Arguments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Prometheus,
}

/// Adaptive Cache - simulate a cached workload against a slow catalog
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML cache configuration file
    #[arg(long, env = "CACHE_CONFIG")]
    config: Option<PathBuf>,

    /// Override max_cache_size
    #[arg(long, env = "MAX_CACHE_SIZE")]
    max_cache_size: Option<usize>,

    /// Override eviction_batch_size
    #[arg(long, env = "EVICTION_BATCH_SIZE")]
    eviction_batch_size: Option<usize>,

    /// Override popularity_threshold
    #[arg(long, env = "POPULARITY_THRESHOLD")]
    popularity_threshold: Option<u64>,

    /// Lookups to issue
    #[arg(long, default_value = "10000")]
    requests: u64,

    /// Distinct hot keys
    #[arg(long, default_value = "100")]
    hot_keys: u64,

    /// Distinct cold keys
    #[arg(long, default_value = "5000")]
    cold_keys: u64,

    /// Share of requests hitting hot keys (0.0 - 1.0)
    #[arg(long, default_value = "0.8")]
    hot_ratio: f64,

    /// Lookups in flight at once
    #[arg(long, default_value = "16")]
    concurrency: usize,

    /// Simulated remote latency in milliseconds
    #[arg(long, default_value = "2")]
    fetch_latency_ms: u64,

    /// Pattern keys the hot keys are grouped under
    #[arg(long, default_value = "10")]
    pattern_groups: u64,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn cache_config(&self) -> Result<CacheConfig> {
        let mut config = match &self.config {
            Some(path) => CacheConfig::from_file(path)?,
            None => CacheConfig::default(),
        };

        if let Some(size) = self.max_cache_size {
            config.max_cache_size = size;
        }
        if let Some(batch) = self.eviction_batch_size {
            config.eviction_batch_size = batch;
        }
        if let Some(threshold) = self.popularity_threshold {
            config.popularity_threshold = threshold;
        }

        config.validate()?;
        Ok(config)
    }

    fn workload(&self) -> Workload {
        Workload {
            requests: self.requests,
            hot_keys: self.hot_keys,
            cold_keys: self.cold_keys,
            hot_ratio: self.hot_ratio,
            concurrency: self.concurrency,
            fetch_latency: Duration::from_millis(self.fetch_latency_ms),
            pattern_groups: self.pattern_groups,
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = args.cache_config()?;
    let workload = args.workload();

    info!("Starting adaptive cache simulation");
    info!("  Max cache size: {}", config.max_cache_size);
    info!("  Eviction batch size: {}", config.eviction_batch_size);
    info!("  Popularity threshold: {}", config.popularity_threshold);
    info!(
        "  Workload: {} requests, {} hot / {} cold keys, concurrency {}",
        workload.requests, workload.hot_keys, workload.cold_keys, workload.concurrency
    );

    let cache = AdaptiveCache::<String>::new(config)?;
    let remote = RemoteCatalog::new(workload.fetch_latency);

    let report = simulation::run(&cache, &workload, &remote).await?;

    info!(
        "Simulation complete: {} remote calls for {} requests in {} ms",
        report.remote_calls, report.requests, report.elapsed_ms
    );

    match args.format {
        OutputFormat::Text => println!("{}", report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Prometheus => {
            let exporter = StatisticsExporter::new()?;
            exporter.update(&report.statistics);
            print!("{}", exporter.render()?);
        }
    }

    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs go to stderr so reports on stdout stay machine-readable
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
