//! Memoization of a single function.

use std::fmt;
use std::sync::Arc;

use quickcache_core::{
    validate_specs, BoundArgs, CacheKey, CallArgs, ConfigError, FunctionFingerprint, Introspect,
    KeyCodec, KeyScheme, QuickCacheError, QuickCacheResult, SkipSpec, VarySpec,
};
use quickcache_storage::Cache;

/// The function being memoized. It receives its bound arguments.
pub type MemoizedFn<V, E> = Arc<dyn Fn(&BoundArgs) -> Result<V, E> + Send + Sync>;

/// Binds a function, its key scheme and skip rule to a cache.
///
/// Each call is independent: the helper holds no per-call state, all
/// persistent state lives in the cache. Concurrent calls with the same key
/// may each compute and store the value; there is no single-flight guard.
pub struct MemoizationHelper<V, E = QuickCacheError> {
    signature: Arc<dyn Introspect>,
    function: MemoizedFn<V, E>,
    cache: Arc<dyn Cache<V>>,
    scheme: KeyScheme,
    skip: SkipSpec,
}

impl<V, E> fmt::Debug for MemoizationHelper<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizationHelper")
            .field("function", &self.signature.name())
            .field("prefix", &self.scheme.fingerprint().to_string())
            .field("vary_on", self.scheme.vary_on())
            .field("skip", &self.skip)
            .finish()
    }
}

impl<V, E> MemoizationHelper<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: From<QuickCacheError>,
{
    /// Validate the configuration against the function's signature and
    /// fingerprint its source.
    ///
    /// Fails if a vary-on or skip argument is not a declared parameter, if
    /// the skip argument is also varied on, or if the source is unavailable.
    pub fn new<F>(
        signature: impl Introspect + 'static,
        cache: Arc<dyn Cache<V>>,
        vary_on: VarySpec,
        skip: SkipSpec,
        codec: KeyCodec,
        function: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&BoundArgs) -> Result<V, E> + Send + Sync + 'static,
    {
        validate_specs(&signature, &vary_on, &skip)?;
        let fingerprint = FunctionFingerprint::of(&signature)?;
        Ok(Self {
            signature: Arc::new(signature),
            function: Arc::new(function),
            cache,
            scheme: KeyScheme::new(fingerprint, vary_on, codec),
            skip,
        })
    }

    /// Call through the cache.
    ///
    /// Without skip: return the cached value if present, otherwise compute,
    /// store and return it. With skip: always compute, then overwrite the
    /// cached value so later calls see the fresh result. Nothing is stored
    /// when the function fails.
    pub fn call(&self, args: &CallArgs) -> Result<V, E> {
        let bound = self.bind(args)?;
        let skip = self
            .skip
            .should_skip(args, &bound)
            .map_err(QuickCacheError::from)?;

        if skip {
            let value = (self.function)(&bound)?;
            let key = self.key(args, &bound)?;
            tracing::debug!(key = %key, "skipping cache lookup");
            self.cache
                .set(key.as_str(), value.clone())
                .map_err(QuickCacheError::from)?;
            return Ok(value);
        }

        tracing::debug!(function = self.signature.name(), "checking caches");
        let key = self.key(args, &bound)?;
        tracing::debug!(key = %key);
        if let Some(value) = self
            .cache
            .get(key.as_str())
            .map_err(QuickCacheError::from)?
        {
            return Ok(value);
        }

        tracing::debug!(function = self.signature.name(), "cache miss, calling");
        let value = (self.function)(&bound)?;
        self.cache
            .set(key.as_str(), value.clone())
            .map_err(QuickCacheError::from)?;
        Ok(value)
    }

    /// Read the cached value for these arguments without calling the function.
    pub fn peek(&self, args: &CallArgs) -> QuickCacheResult<Option<V>> {
        let key = self.cache_key(args)?;
        tracing::debug!(key = %key, "peek");
        Ok(self.cache.get(key.as_str())?)
    }

    /// Prepare an overwrite of the cached value for these arguments.
    ///
    /// ```ignore
    /// helper.poke(&CallArgs::new().arg("name"))?.to("NEW VALUE".to_string())?;
    /// ```
    pub fn poke(&self, args: &CallArgs) -> QuickCacheResult<Settable<'_, V>> {
        let key = self.cache_key(args)?;
        tracing::debug!(key = %key, "poke");
        Ok(Settable {
            cache: self.cache.as_ref(),
            key,
        })
    }

    /// Remove the cached value for these arguments.
    pub fn invalidate(&self, args: &CallArgs) -> QuickCacheResult<()> {
        let key = self.cache_key(args)?;
        Ok(self.cache.delete(key.as_str())?)
    }

    /// The cache key these arguments map to.
    pub fn cache_key(&self, args: &CallArgs) -> QuickCacheResult<CacheKey> {
        let bound = self.bind(args)?;
        self.key(args, &bound)
    }

    fn bind(&self, args: &CallArgs) -> QuickCacheResult<BoundArgs> {
        Ok(self.signature.bind(args)?)
    }

    fn key(&self, args: &CallArgs, bound: &BoundArgs) -> QuickCacheResult<CacheKey> {
        Ok(self.scheme.key(args, bound)?)
    }
}

impl<V, E> MemoizationHelper<V, E> {
    /// `<name>.<source hash>`, the key namespace of this function.
    pub fn prefix(&self) -> String {
        self.scheme.fingerprint().to_string()
    }

    pub fn fingerprint(&self) -> &FunctionFingerprint {
        self.scheme.fingerprint()
    }

    pub fn name(&self) -> &str {
        self.signature.name()
    }
}

/// One-shot setter bound to a derived key.
#[must_use = "a Settable does nothing until `to` is called"]
pub struct Settable<'a, V> {
    cache: &'a dyn Cache<V>,
    key: CacheKey,
}

impl<V> Settable<'_, V> {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Store `value` under the key.
    pub fn to(self, value: V) -> QuickCacheResult<()> {
        Ok(self.cache.set(self.key.as_str(), value)?)
    }
}
