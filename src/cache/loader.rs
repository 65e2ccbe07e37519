//! Read-Through Loading
//!
//! The cache does no I/O of its own. A [`Loader`] is the port through which
//! [`AdaptiveCache::get_or_load`](super::AdaptiveCache::get_or_load) reaches
//! the remote service on a miss.

use async_trait::async_trait;

use crate::error::Result;

/// Source of values for cache misses
#[async_trait]
pub trait Loader<K: ?Sized, V>: Send + Sync {
    /// Fetch the value for `key` from the backing service
    async fn load(&self, key: &K) -> Result<V>;
}

/// Adapts a synchronous closure into a [`Loader`]
///
/// Handy for tests and for sources that are already in memory.
pub struct FnLoader<F> {
    func: F,
}

impl<F> FnLoader<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<K, V, F> Loader<K, V> for FnLoader<F>
where
    K: Sync + ?Sized + 'static,
    V: Send + 'static,
    F: Fn(&K) -> Result<V> + Send + Sync,
{
    async fn load(&self, key: &K) -> Result<V> {
        (self.func)(key)
    }
}
