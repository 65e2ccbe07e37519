//! Error types for the adaptive cache

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by a caller-supplied key serializer
pub type SerializerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while configuring or using the cache
///
/// Capacity overrun, expiry and eviction races are not errors: the cache
/// resolves them internally and never surfaces them to callers.
#[derive(Error, Debug)]
pub enum Error {
    /// The injected key serializer failed; the caller's error is the source
    #[error("Key serialization failed: {0}")]
    KeySerialization(#[source] SerializerError),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Duration parse error
    #[error("Failed to parse duration: {0}")]
    DurationParse(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML configuration error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Prometheus registration or encoding error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// A read-through loader failed to produce a value
    #[error("Load failed: {0}")]
    Load(String),
}

impl Error {
    /// Wrap a serializer failure without altering it
    pub fn key_serialization(err: impl Into<SerializerError>) -> Self {
        Error::KeySerialization(err.into())
    }
}
