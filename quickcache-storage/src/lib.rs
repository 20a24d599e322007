//! quickcache storage - cache tiers and tiered lookup
//!
//! Backends are injected through [`CacheBackend`]. This crate only wraps
//! them: [`CacheTier`] fixes a timeout and an optional key prefix,
//! [`TieredCache`] chains tiers with backfill on hit. [`InMemoryCache`] is
//! the one backend shipped here, for local tiers and tests.

pub mod memory;
pub mod registry;
pub mod tier;
pub mod tiered;
pub mod traits;

pub use memory::InMemoryCache;
pub use registry::{CacheRegistry, TierConfig, TieredConfig};
pub use tier::{CacheTier, PrefixFn};
pub use tiered::{TierPreset, TieredCache};
pub use traits::{Cache, CacheBackend, CacheResult};
