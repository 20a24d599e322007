//! Cache capability traits.
//!
//! Two levels of abstraction:
//!
//! - [`CacheBackend`] is the raw key-value store (in-process map, Redis,
//!   memcached, ...). It takes a per-write timeout and may answer any
//!   operation with [`CacheError::ForceSkip`] to mean "treat as a miss".
//! - [`Cache`] is what the memoization layer talks to. Timeouts are already
//!   fixed (per tier) and the bypass signal has been absorbed, so `Err`
//!   always means a hard failure.

use std::time::Duration;

use quickcache_core::CacheError;

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Raw key-value storage backend.
///
/// Implementations should be thread-safe; the memoization layer does no
/// locking of its own and concurrent calls may race to store the same key.
pub trait CacheBackend<V>: Send + Sync {
    /// Get a value, or `None` when absent or expired.
    fn get(&self, key: &str) -> CacheResult<Option<V>>;

    /// Store a value. `None` means the backend's own default timeout.
    fn set(&self, key: &str, value: V, timeout: Option<Duration>) -> CacheResult<()>;

    /// Remove a value. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> CacheResult<()>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A cache as seen by the memoization layer: a single tier or a whole
/// [`TieredCache`](crate::TieredCache).
pub trait Cache<V>: Send + Sync {
    fn get(&self, key: &str) -> CacheResult<Option<V>>;

    fn set(&self, key: &str, value: V) -> CacheResult<()>;

    fn delete(&self, key: &str) -> CacheResult<()>;
}
