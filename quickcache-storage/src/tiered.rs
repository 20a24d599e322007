//! Ordered chain of cache tiers presented as one cache.
//!
//! Order tiers from fastest / most local to slowest / most shared. A read
//! walks the chain front to back; a hit in tier `k` is written back into
//! every earlier tier that missed, each with its own timeout.

use std::sync::Arc;
use std::time::Duration;

use crate::tier::{CacheTier, PrefixFn};
use crate::traits::{Cache, CacheBackend, CacheResult};

/// `(backend, timeout, prefix)` triple describing a tier before filtering.
pub type TierPreset<V> = (Arc<dyn CacheBackend<V>>, Option<Duration>, Option<PrefixFn>);

/// Several tiers behind a single [`Cache`].
#[derive(Debug)]
pub struct TieredCache<V> {
    tiers: Vec<CacheTier<V>>,
}

impl<V> Clone for TieredCache<V> {
    fn clone(&self) -> Self {
        Self {
            tiers: self.tiers.clone(),
        }
    }
}

impl<V> TieredCache<V> {
    pub fn new(tiers: Vec<CacheTier<V>>) -> Self {
        Self { tiers }
    }

    /// Build from presets, leaving out any tier whose timeout is absent or
    /// zero. A preset without a timeout disables that tier.
    pub fn from_presets(presets: impl IntoIterator<Item = TierPreset<V>>) -> Self {
        let tiers = presets
            .into_iter()
            .filter_map(|(backend, timeout, prefix)| match timeout {
                Some(t) if !t.is_zero() => {
                    Some(CacheTier::new(backend, Some(t)).with_prefix_fn(prefix))
                }
                _ => {
                    tracing::debug!(tier = backend.name(), "dropping tier without timeout");
                    None
                }
            })
            .collect();
        Self::new(tiers)
    }

    /// The usual two-tier layout: a short-lived, optionally session-scoped
    /// local tier in front of a longer-lived shared tier.
    pub fn local_then_shared(
        local: Arc<dyn CacheBackend<V>>,
        memoize_timeout: Option<Duration>,
        session_prefix: Option<PrefixFn>,
        shared: Arc<dyn CacheBackend<V>>,
        timeout: Option<Duration>,
    ) -> Self {
        Self::from_presets([
            (local, memoize_timeout, session_prefix),
            (shared, timeout, None),
        ])
    }

    pub fn tiers(&self) -> &[CacheTier<V>] {
        &self.tiers
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl<V: Clone + Send + Sync> Cache<V> for TieredCache<V> {
    fn get(&self, key: &str) -> CacheResult<Option<V>> {
        let mut missed: Vec<&CacheTier<V>> = Vec::new();
        for tier in &self.tiers {
            let Some(value) = tier.get(key)? else {
                missed.push(tier);
                continue;
            };
            for missed_tier in &missed {
                if let Err(err) = missed_tier.set(key, value.clone()) {
                    tracing::warn!(tier = missed_tier.name(), error = %err, "backfill failed");
                }
            }
            tracing::debug!(
                missed = ?missed.iter().map(|t| t.name()).collect::<Vec<_>>(),
                hit = tier.name(),
                "tiered cache hit"
            );
            return Ok(Some(value));
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: V) -> CacheResult<()> {
        let mut first_error = None;
        for tier in &self.tiers {
            if let Err(err) = tier.set(key, value.clone()) {
                tracing::warn!(tier = tier.name(), error = %err, "tier write failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        let mut first_error = None;
        for tier in &self.tiers {
            if let Err(err) = tier.delete(key) {
                tracing::warn!(tier = tier.name(), error = %err, "tier delete failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryCache;
    use quickcache_core::CacheError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn locmem(name: &str) -> Arc<InMemoryCache<String>> {
        Arc::new(InMemoryCache::new(name, None))
    }

    fn tier(backend: &Arc<InMemoryCache<String>>, ttl: Duration) -> CacheTier<String> {
        CacheTier::new(backend.clone() as Arc<dyn CacheBackend<String>>, Some(ttl))
    }

    /// Backend whose writes fail hard and count attempts.
    #[derive(Default)]
    struct FailingWrites {
        attempts: AtomicUsize,
    }

    impl CacheBackend<String> for FailingWrites {
        fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: String, _timeout: Option<Duration>) -> CacheResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::backend("failing", "disk full"))
        }

        fn delete(&self, _key: &str) -> CacheResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::backend("failing", "disk full"))
        }
    }

    #[test]
    fn test_miss_everywhere_mutates_nothing() {
        let (a, b) = (locmem("a"), locmem("b"));
        let cache = TieredCache::new(vec![
            tier(&a, Duration::from_secs(60)),
            tier(&b, Duration::from_secs(60)),
        ]);
        assert_eq!(cache.get("k").unwrap(), None);
        assert!(a.is_empty());
        assert!(b.is_empty());
    }

    #[test]
    fn test_hit_in_slow_tier_backfills_fast_tier() {
        let (fast, slow) = (locmem("fast"), locmem("slow"));
        slow.set("k", "from slow".to_string(), None).unwrap();
        let cache = TieredCache::new(vec![
            tier(&fast, Duration::from_secs(60)),
            tier(&slow, Duration::from_secs(60)),
        ]);

        assert_eq!(cache.get("k").unwrap(), Some("from slow".to_string()));
        assert_eq!(fast.get("k").unwrap(), Some("from slow".to_string()));

        // Next read is served by the fast tier even if the slow tier lost it.
        slow.delete("k").unwrap();
        assert_eq!(cache.get("k").unwrap(), Some("from slow".to_string()));
    }

    #[test]
    fn test_backfill_uses_each_tier_timeout() {
        let (fast, slow) = (locmem("fast"), locmem("slow"));
        slow.set("k", "v".to_string(), None).unwrap();
        let cache = TieredCache::new(vec![
            tier(&fast, Duration::from_millis(10)),
            tier(&slow, Duration::from_secs(60)),
        ]);
        cache.get("k").unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(fast.get("k").unwrap(), None);
        assert_eq!(slow.get("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_backfill_failure_is_swallowed() {
        let failing = Arc::new(FailingWrites::default());
        let slow = locmem("slow");
        slow.set("k", "v".to_string(), None).unwrap();
        let cache = TieredCache::new(vec![
            CacheTier::new(failing.clone() as Arc<dyn CacheBackend<String>>, None),
            tier(&slow, Duration::from_secs(60)),
        ]);
        assert_eq!(cache.get("k").unwrap(), Some("v".to_string()));
        assert_eq!(failing.attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_attempts_every_tier_then_reports() {
        let failing = Arc::new(FailingWrites::default());
        let slow = locmem("slow");
        let cache = TieredCache::new(vec![
            CacheTier::new(failing.clone() as Arc<dyn CacheBackend<String>>, None),
            tier(&slow, Duration::from_secs(60)),
        ]);

        let result = cache.set("k", "v".to_string());
        assert!(matches!(result, Err(CacheError::Backend { .. })));
        assert_eq!(slow.get("k").unwrap(), Some("v".to_string()));

        slow.set("other", "x".to_string(), None).unwrap();
        assert!(cache.delete("other").is_err());
        assert_eq!(slow.get("other").unwrap(), None);
        assert_eq!(failing.attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_set_and_delete_fan_out() {
        let (a, b) = (locmem("a"), locmem("b"));
        let cache = TieredCache::new(vec![
            tier(&a, Duration::from_secs(60)),
            tier(&b, Duration::from_secs(60)),
        ]);
        cache.set("k", "v".to_string()).unwrap();
        assert_eq!(a.get("k").unwrap(), Some("v".to_string()));
        assert_eq!(b.get("k").unwrap(), Some("v".to_string()));

        cache.delete("k").unwrap();
        assert!(a.get("k").unwrap().is_none());
        assert!(b.get("k").unwrap().is_none());
    }

    #[test]
    fn test_presets_drop_tiers_without_timeout() {
        let preset = |name: &str, ttl: Option<Duration>| -> TierPreset<String> {
            (locmem(name) as Arc<dyn CacheBackend<String>>, ttl, None)
        };
        let presets = vec![
            preset("none", None),
            preset("zero", Some(Duration::ZERO)),
            preset("kept", Some(Duration::from_secs(5))),
        ];
        let cache = TieredCache::from_presets(presets);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.tiers()[0].name(), "kept");
        assert_eq!(cache.tiers()[0].timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_local_then_shared_layout() {
        let cache = TieredCache::<String>::local_then_shared(
            locmem("locmem"),
            Some(Duration::from_secs(10)),
            Some(Arc::new(|| "session-a/".to_string())),
            locmem("default"),
            Some(Duration::from_secs(300)),
        );
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.tiers()[0].prefixed_key("k"), "session-a/k");
        assert_eq!(cache.tiers()[1].prefixed_key("k"), "k");
    }
}
