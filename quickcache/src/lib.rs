//! quickcache - memoize deterministic functions through a chain of caches
//!
//! ```ignore
//! use quickcache::prelude::*;
//!
//! let helper = QuickCache::<String>::new()
//!     .vary_on(["name"])
//!     .local_then_shared(locmem, Some(Duration::from_secs(10)), None, redis, Some(Duration::from_secs(300)))
//!     .build(signature, |args: &BoundArgs| lookup(args))?;
//!
//! let value = helper.call(&CallArgs::new().arg("ben"))?;
//! helper.invalidate(&CallArgs::new().arg("ben"))?;
//! ```
//!
//! Key derivation lives in `quickcache-core`, tiers and backends in
//! `quickcache-storage`; both are re-exported here.

pub mod config;
pub mod helper;

pub use config::QuickCache;
pub use helper::{MemoizationHelper, MemoizedFn, Settable};

pub use quickcache_core as core;
pub use quickcache_storage as storage;

pub mod prelude {
    pub use crate::{MemoizationHelper, QuickCache, Settable};
    pub use quickcache_core::{
        BoundArgs, CacheError, CacheKey, CallArgs, ConfigError, FnSignature, Introspect,
        KeyError, QuickCacheError, QuickCacheResult, Record, SkipSpec, Value, VarySpec,
    };
    pub use quickcache_storage::{
        Cache, CacheBackend, CacheRegistry, CacheTier, InMemoryCache, PrefixFn, TieredCache,
        TieredConfig,
    };
}
