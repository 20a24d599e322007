//! Reusable memoization configuration.
//!
//! A [`QuickCache`] collects the vary-on spec, cache, skip rule and encoding
//! hook, then wraps a function into a [`MemoizationHelper`]. It is `Clone`,
//! so a partially configured value can serve as a template:
//!
//! ```ignore
//! let base = QuickCache::new().cache(shared_cache);
//! let by_user = base.clone().vary_on(["user_id"]).build(signature, load_user)?;
//! let by_team = base.clone().vary_on(["team.id"]).build(other, load_team)?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use quickcache_core::{
    default_encoding_assert, BoundArgs, CallArgs, ConfigError, EncodingAssert, Introspect,
    KeyCodec, KeyError, QuickCacheError, SkipSpec, Value, VarySpec,
};
use quickcache_storage::{Cache, CacheBackend, PrefixFn, TieredCache};

use crate::helper::MemoizationHelper;

/// Builder for [`MemoizationHelper`].
pub struct QuickCache<V> {
    vary_on: Option<VarySpec>,
    cache: Option<Arc<dyn Cache<V>>>,
    skip: SkipSpec,
    encoding_assert: EncodingAssert,
}

impl<V> Clone for QuickCache<V> {
    fn clone(&self) -> Self {
        Self {
            vary_on: self.vary_on.clone(),
            cache: self.cache.clone(),
            skip: self.skip.clone(),
            encoding_assert: Arc::clone(&self.encoding_assert),
        }
    }
}

impl<V> Default for QuickCache<V> {
    fn default() -> Self {
        Self {
            vary_on: None,
            cache: None,
            skip: SkipSpec::Never,
            encoding_assert: default_encoding_assert(),
        }
    }
}

impl<V> fmt::Debug for QuickCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuickCache")
            .field("vary_on", &self.vary_on)
            .field("cache", &self.cache.is_some())
            .field("skip", &self.skip)
            .finish()
    }
}

impl<V> QuickCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Vary on the named arguments. Dotted names (`"item.id"`) reach into
    /// attributes of an argument. An empty list caches a single value.
    pub fn vary_on<I, S>(mut self, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.vary_on = Some(VarySpec::args(expressions));
        self
    }

    /// Derive the vary-on values with a function of the raw call arguments.
    pub fn vary_on_fn<F>(mut self, extract: F) -> Self
    where
        F: Fn(&CallArgs) -> Result<Vec<Value>, KeyError> + Send + Sync + 'static,
    {
        self.vary_on = Some(VarySpec::extractor(extract));
        self
    }

    pub fn vary_on_spec(mut self, spec: VarySpec) -> Self {
        self.vary_on = Some(spec);
        self
    }

    pub fn cache(mut self, cache: impl Cache<V> + 'static) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Use a cache that is shared with other helpers.
    pub fn shared_cache(mut self, cache: Arc<dyn Cache<V>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Short-lived local tier in front of a shared tier. A `None` timeout
    /// leaves that tier out.
    pub fn local_then_shared(
        self,
        local: Arc<dyn CacheBackend<V>>,
        memoize_timeout: Option<Duration>,
        session_prefix: Option<PrefixFn>,
        shared: Arc<dyn CacheBackend<V>>,
        timeout: Option<Duration>,
    ) -> Self {
        self.cache(TieredCache::local_then_shared(
            local,
            memoize_timeout,
            session_prefix,
            shared,
            timeout,
        ))
    }

    /// Bypass the lookup whenever this argument is truthy.
    pub fn skip_arg(mut self, name: impl Into<String>) -> Self {
        self.skip = SkipSpec::param(name);
        self
    }

    /// Bypass the lookup whenever the predicate holds for the call.
    pub fn skip_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CallArgs) -> bool + Send + Sync + 'static,
    {
        self.skip = SkipSpec::predicate(predicate);
        self
    }

    /// Hook for encoding sanity checks, called with `(condition, message)`.
    pub fn assert_function<F>(mut self, f: F) -> Self
    where
        F: Fn(bool, &str) + Send + Sync + 'static,
    {
        self.encoding_assert = Arc::new(f);
        self
    }

    /// Required settings that are still unset, in a stable order.
    pub fn missing_values(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.vary_on.is_none() {
            missing.push("vary_on".to_string());
        }
        if self.cache.is_none() {
            missing.push("cache".to_string());
        }
        missing
    }

    /// Wrap `function` described by `signature`.
    pub fn build<E, F>(
        &self,
        signature: impl Introspect + 'static,
        function: F,
    ) -> Result<MemoizationHelper<V, E>, ConfigError>
    where
        E: From<QuickCacheError>,
        F: Fn(&BoundArgs) -> Result<V, E> + Send + Sync + 'static,
    {
        let (Some(vary_on), Some(cache)) = (&self.vary_on, &self.cache) else {
            return Err(ConfigError::MissingValues {
                missing: self.missing_values(),
            });
        };
        MemoizationHelper::new(
            signature,
            Arc::clone(cache),
            vary_on.clone(),
            self.skip.clone(),
            KeyCodec::with_encoding_assert(Arc::clone(&self.encoding_assert)),
            function,
        )
    }
}
