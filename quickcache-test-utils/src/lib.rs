//! quickcache Test Utilities
//!
//! Shared test infrastructure for the quickcache workspace:
//! - Instrumented cache backends that record or inject failures
//! - Proptest generators for key-encodable values
//! - Fixtures for signatures and tier layouts
//! - Assertions on derived cache keys

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

pub use quickcache_core::{
    BoundArgs, CacheError, CacheKey, CallArgs, FnSignature, Record, Value, KEY_NAMESPACE,
};
pub use quickcache_storage::{CacheBackend, CacheResult, InMemoryCache};

// ============================================================================
// MOCK CACHES
// ============================================================================

/// Ordered, shared log of cache and function events.
///
/// Cloning shares the underlying buffer, so several caches and the memoized
/// function can append to one timeline.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.into());
        }
    }

    /// Take every event recorded so far, leaving the log empty.
    pub fn drain(&self) -> Vec<String> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

/// In-memory backend that logs `"<name> hit"`, `"<name> miss"` and
/// `"<name> set"` for every operation.
#[derive(Debug)]
pub struct RecordingCache<V> {
    name: String,
    inner: InMemoryCache<V>,
    log: EventLog,
    silent_set: bool,
}

impl<V: Clone + Send + Sync> RecordingCache<V> {
    pub fn new(name: impl Into<String>, log: EventLog) -> Self {
        let name = name.into();
        Self {
            inner: InMemoryCache::new(name.clone(), None),
            name,
            log,
            silent_set: false,
        }
    }

    /// Stop logging writes, keeping the timeline down to reads.
    pub fn silent_set(mut self) -> Self {
        self.silent_set = true;
        self
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) -> CacheResult<()> {
        self.inner.clear()
    }
}

impl<V: Clone + Send + Sync> CacheBackend<V> for RecordingCache<V> {
    fn get(&self, key: &str) -> CacheResult<Option<V>> {
        let value = self.inner.get(key)?;
        let outcome = if value.is_some() { "hit" } else { "miss" };
        self.log.push(format!("{} {}", self.name, outcome));
        Ok(value)
    }

    fn set(&self, key: &str, value: V, timeout: Option<Duration>) -> CacheResult<()> {
        if !self.silent_set {
            self.log.push(format!("{} set", self.name));
        }
        self.inner.set(key, value, timeout)
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        self.inner.delete(key)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// How a [`FlakyCache`] currently behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlakyMode {
    #[default]
    Healthy,
    /// Every operation signals bypass.
    Skip,
    /// Every operation fails hard.
    Fail,
}

/// In-memory backend whose behavior can be switched at runtime.
#[derive(Debug)]
pub struct FlakyCache<V> {
    name: String,
    inner: InMemoryCache<V>,
    mode: RwLock<FlakyMode>,
}

impl<V: Clone + Send + Sync> FlakyCache<V> {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            inner: InMemoryCache::new(name.clone(), None),
            name,
            mode: RwLock::new(FlakyMode::Healthy),
        }
    }

    pub fn set_mode(&self, mode: FlakyMode) {
        if let Ok(mut current) = self.mode.write() {
            *current = mode;
        }
    }

    pub fn mode(&self) -> FlakyMode {
        self.mode.read().map(|m| *m).unwrap_or_default()
    }

    /// The backing store, bypassing the injected behavior.
    pub fn inner(&self) -> &InMemoryCache<V> {
        &self.inner
    }

    fn check(&self) -> CacheResult<()> {
        match self.mode() {
            FlakyMode::Healthy => Ok(()),
            FlakyMode::Skip => Err(CacheError::ForceSkip),
            FlakyMode::Fail => Err(CacheError::backend(&self.name, "injected failure")),
        }
    }
}

impl<V: Clone + Send + Sync> CacheBackend<V> for FlakyCache<V> {
    fn get(&self, key: &str) -> CacheResult<Option<V>> {
        self.check()?;
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: V, timeout: Option<Duration>) -> CacheResult<()> {
        self.check()?;
        self.inner.set(key, value, timeout)
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        self.check()?;
        self.inner.delete(key)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for values that have a key encoding.

    use super::*;
    use chrono::{DateTime, FixedOffset, NaiveDateTime};
    use proptest::prelude::*;
    use uuid::Uuid;

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Naive timestamps between 2000 and 2040, with or without microseconds.
    pub fn arb_naive_datetime() -> impl Strategy<Value = NaiveDateTime> {
        (946_684_800i64..2_208_988_800i64, prop_oneof![Just(0u32), 0u32..1_000_000]).prop_map(
            |(secs, micros)| {
                DateTime::from_timestamp(secs, micros * 1_000)
                    .unwrap_or_default()
                    .naive_utc()
            },
        )
    }

    /// Aware timestamps at whole-hour offsets between -12:00 and +14:00.
    pub fn arb_datetime() -> impl Strategy<Value = DateTime<FixedOffset>> {
        (arb_naive_datetime(), -12i32..=14).prop_filter_map("valid offset", |(naive, hours)| {
            FixedOffset::east_opt(hours * 3600).map(|offset| naive.and_utc().with_timezone(&offset))
        })
    }

    /// Finite floats; NaN never compares equal to itself.
    pub fn arb_float() -> impl Strategy<Value = f64> {
        any::<f64>().prop_filter("finite", |x| x.is_finite())
    }

    pub fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::None),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            arb_float().prop_map(Value::Float),
            ".{0,40}".prop_map(Value::Text),
            prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
            arb_uuid().prop_map(Value::Uuid),
            arb_naive_datetime().prop_map(Value::NaiveDateTime),
            arb_datetime().prop_map(Value::DateTime),
        ]
    }

    /// Any encodable value, nesting lists, maps and sets a few levels deep.
    pub fn arb_value() -> impl Strategy<Value = Value> {
        arb_scalar().prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
                prop::collection::vec((inner.clone(), inner.clone()), 0..6).prop_map(Value::Map),
                prop::collection::vec(inner, 0..6).prop_map(Value::Set),
            ]
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built signatures and backends for common scenarios.

    use super::*;

    /// A signature with required parameters and a source string derived from
    /// `body`, so different bodies fingerprint differently.
    pub fn signature(name: &str, params: &[&str], body: &str) -> FnSignature {
        let source = format!("fn {}({}) {{ {} }}", name, params.join(", "), body);
        params
            .iter()
            .fold(FnSignature::new(name), |sig, param| sig.param(*param))
            .with_source(source)
    }

    pub fn locmem<V: Clone + Send + Sync + 'static>(name: &str) -> Arc<InMemoryCache<V>> {
        Arc::new(InMemoryCache::new(name, None))
    }

    /// A `"local"` and a `"shared"` recording backend writing to one log.
    pub fn recording_pair<V: Clone + Send + Sync + 'static>(
        log: &EventLog,
    ) -> (Arc<RecordingCache<V>>, Arc<RecordingCache<V>>) {
        (
            Arc::new(RecordingCache::new("local", log.clone())),
            Arc::new(RecordingCache::new("shared", log.clone())),
        )
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on the shape of derived keys.

    use super::*;

    /// Assert `key` is `quickcache.<name>.<8 hex>/<args>` and return `<args>`.
    pub fn assert_key_shape<'a>(key: &'a CacheKey, name: &str) -> &'a str {
        let expected = format!("{}.{}.", KEY_NAMESPACE, name);
        let rest = key
            .as_str()
            .strip_prefix(&expected)
            .unwrap_or_else(|| panic!("key {:?} does not start with {:?}", key.as_str(), expected));
        let (hash, args) = rest
            .split_once('/')
            .unwrap_or_else(|| panic!("key {:?} has no argument separator", key.as_str()));
        assert_eq!(hash.len(), 8, "source hash in {:?}", key.as_str());
        assert!(
            hash.chars().all(|c| c.is_ascii_hexdigit()),
            "source hash in {:?} is not hex",
            key.as_str()
        );
        args
    }

    /// Assert the argument part was collapsed to `H<32 hex>`.
    pub fn assert_hashed_args(args: &str) {
        let digest = args
            .strip_prefix('H')
            .unwrap_or_else(|| panic!("args {:?} were not hashed", args));
        assert_eq!(digest.len(), 32);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

// ============================================================================
// TESTS
// ============================================================================
