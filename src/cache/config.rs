//! Cache Configuration
//!
//! Size limits, TTL tiers and the popularity threshold. Loadable from YAML,
//! where durations are written as Go-style strings ("6h", "7d", "1h30m").

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Entry count above which an eviction sweep runs
    pub max_cache_size: usize,
    /// Maximum entries removed by a single sweep
    pub eviction_batch_size: usize,
    /// TTL when no priority is given
    #[serde(with = "duration_str")]
    pub default_ttl: Duration,
    /// TTL for `Priority::Low`
    #[serde(with = "duration_str")]
    pub low_priority_ttl: Duration,
    /// TTL for `Priority::Normal`
    #[serde(with = "duration_str")]
    pub normal_priority_ttl: Duration,
    /// TTL for `Priority::High`
    #[serde(with = "duration_str")]
    pub high_priority_ttl: Duration,
    /// TTL for entries written under a popular pattern key
    #[serde(with = "duration_str")]
    pub popular_item_ttl: Duration,
    /// Writes against a pattern key before it counts as popular
    pub popularity_threshold: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size: 10_000,
            eviction_batch_size: 1_000,
            default_ttl: Duration::from_secs(24 * 3600),
            low_priority_ttl: Duration::from_secs(6 * 3600),
            normal_priority_ttl: Duration::from_secs(24 * 3600),
            high_priority_ttl: Duration::from_secs(72 * 3600),
            popular_item_ttl: Duration::from_secs(168 * 3600),
            popularity_threshold: 10,
        }
    }
}

impl CacheConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_cache_size == 0 {
            return Err(Error::Config("max_cache_size must be > 0".into()));
        }
        if self.eviction_batch_size == 0 {
            return Err(Error::Config("eviction_batch_size must be > 0".into()));
        }
        if self.popularity_threshold == 0 {
            return Err(Error::Config("popularity_threshold must be > 0".into()));
        }

        let ttls = [
            ("default_ttl", self.default_ttl),
            ("low_priority_ttl", self.low_priority_ttl),
            ("normal_priority_ttl", self.normal_priority_ttl),
            ("high_priority_ttl", self.high_priority_ttl),
            ("popular_item_ttl", self.popular_item_ttl),
        ];
        for (name, ttl) in ttls {
            if ttl.is_zero() {
                return Err(Error::Config(format!("{} must be greater than 0", name)));
            }
        }

        Ok(())
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: CacheConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

// =============================================================================
// Duration Parsing
// =============================================================================

/// Parse a Go-style duration string (e.g., "1h", "30m", "7d", "1h30m")
///
/// A trailing bare number is read as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::DurationParse("empty duration string".to_string()));
    }

    let mut total_secs: u64 = 0;
    let mut num_buf = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            num_buf.push(c);
            continue;
        }

        let num: u64 = num_buf
            .parse()
            .map_err(|_| Error::DurationParse(format!("invalid number in duration: {}", s)))?;
        num_buf.clear();

        let multiplier = match c {
            'd' | 'D' => 86400,
            'h' | 'H' => 3600,
            'm' | 'M' => 60,
            's' | 'S' => 1,
            _ => {
                return Err(Error::DurationParse(format!(
                    "unknown duration unit: {}",
                    c
                )))
            }
        };

        total_secs = num
            .checked_mul(multiplier)
            .and_then(|secs| total_secs.checked_add(secs))
            .ok_or_else(|| Error::DurationParse(format!("duration overflows: {}", s)))?;
    }

    if !num_buf.is_empty() {
        let num: u64 = num_buf
            .parse()
            .map_err(|_| Error::DurationParse(format!("invalid number in duration: {}", s)))?;
        total_secs = total_secs
            .checked_add(num)
            .ok_or_else(|| Error::DurationParse(format!("duration overflows: {}", s)))?;
    }

    if total_secs == 0 {
        return Err(Error::DurationParse(
            "duration must be greater than 0".to_string(),
        ));
    }

    Ok(Duration::from_secs(total_secs))
}

/// Render a duration in the format accepted by [`parse_duration`]
///
/// Sub-second precision is dropped.
pub fn format_duration(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    if secs == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    for (unit, size) in [("d", 86400), ("h", 3600), ("m", 60), ("s", 1)] {
        if secs >= size {
            out.push_str(&format!("{}{}", secs / size, unit));
            secs %= size;
        }
    }
    out
}

mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================
