//! Key Hashing
//!
//! Maps caller keys onto fixed-length storage keys: the key is serialized by
//! an injected [`KeySerializer`], digested with SHA-256, and the hex digest is
//! truncated to [`STORAGE_KEY_LEN`] characters. Truncation makes collisions
//! theoretically possible; they are not mitigated.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::STORAGE_KEY_LEN;
use crate::error::{Error, Result, SerializerError};

/// Turns a caller key into the string that gets hashed
pub trait KeySerializer<K: ?Sized>: Send + Sync {
    /// Serialize the key. Errors are propagated to the cache caller untouched.
    fn serialize_key(&self, key: &K) -> Result<String>;
}

/// Serializes keys as JSON with `serde_json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonKeySerializer;

impl<K: Serialize + ?Sized> KeySerializer<K> for JsonKeySerializer {
    fn serialize_key(&self, key: &K) -> Result<String> {
        serde_json::to_string(key).map_err(Error::key_serialization)
    }
}

/// Adapts a closure into a [`KeySerializer`]
#[derive(Clone)]
pub struct FnKeySerializer<F> {
    func: F,
}

impl<F> FnKeySerializer<F> {
    /// Wrap a serialization closure
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<K, F, E> KeySerializer<K> for FnKeySerializer<F>
where
    K: ?Sized,
    F: Fn(&K) -> std::result::Result<String, E> + Send + Sync,
    E: Into<SerializerError>,
{
    fn serialize_key(&self, key: &K) -> Result<String> {
        (self.func)(key).map_err(Error::key_serialization)
    }
}

/// Computes storage keys for caller keys
#[derive(Debug, Clone, Default)]
pub struct KeyHasher<S> {
    serializer: S,
}

impl<S> KeyHasher<S> {
    /// Create a hasher around a serializer
    pub fn new(serializer: S) -> Self {
        Self { serializer }
    }

    /// Hash a caller key into its storage key
    pub fn hash<K: ?Sized>(&self, key: &K) -> Result<String>
    where
        S: KeySerializer<K>,
    {
        let serialized = self.serializer.serialize_key(key)?;
        Ok(digest(&serialized))
    }
}

/// Truncated lowercase hex SHA-256 of a serialized key
pub fn digest(serialized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(STORAGE_KEY_LEN);
    hex
}

// =============================================================================
// Tests
// =============================================================================
