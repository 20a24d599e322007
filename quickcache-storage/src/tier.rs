//! A single cache tier: backend + fixed timeout + optional key prefix.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::traits::{Cache, CacheBackend, CacheResult};

/// Produces a prefix that scopes a tier's keys, e.g. to the current request
/// or task. It is called on every operation.
pub type PrefixFn = Arc<dyn Fn() -> String + Send + Sync>;

/// One cache in a chain.
///
/// Wraps a backend with the timeout used for every write and an optional
/// prefix function. The backend's bypass signal is absorbed here: a skipped
/// read is a miss, a skipped write or delete does nothing.
pub struct CacheTier<V> {
    backend: Arc<dyn CacheBackend<V>>,
    timeout: Option<Duration>,
    prefix: Option<PrefixFn>,
}

impl<V> Clone for CacheTier<V> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            timeout: self.timeout,
            prefix: self.prefix.clone(),
        }
    }
}

impl<V> fmt::Debug for CacheTier<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheTier")
            .field("backend", &self.backend.name())
            .field("timeout", &self.timeout)
            .field("prefixed", &self.prefix.is_some())
            .finish()
    }
}

impl<V> CacheTier<V> {
    /// `timeout` of `None` defers to the backend's default.
    pub fn new(backend: Arc<dyn CacheBackend<V>>, timeout: Option<Duration>) -> Self {
        Self {
            backend,
            timeout,
            prefix: None,
        }
    }

    /// Scope this tier's keys with a prefix function.
    pub fn with_prefix<F>(mut self, prefix: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.prefix = Some(Arc::new(prefix));
        self
    }

    pub(crate) fn with_prefix_fn(mut self, prefix: Option<PrefixFn>) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    /// The key actually sent to the backend.
    pub fn prefixed_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix(), key),
            None => key.to_string(),
        }
    }
}

impl<V: Send + Sync> Cache<V> for CacheTier<V> {
    fn get(&self, key: &str) -> CacheResult<Option<V>> {
        match self.backend.get(&self.prefixed_key(key)) {
            Err(err) if err.is_force_skip() => Ok(None),
            other => other,
        }
    }

    fn set(&self, key: &str, value: V) -> CacheResult<()> {
        match self.backend.set(&self.prefixed_key(key), value, self.timeout) {
            Err(err) if err.is_force_skip() => Ok(()),
            other => other,
        }
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        match self.backend.delete(&self.prefixed_key(key)) {
            Err(err) if err.is_force_skip() => Ok(()),
            other => other,
        }
    }
}
