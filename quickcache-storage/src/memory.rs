//! In-process cache backend with per-entry expiry.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use quickcache_core::CacheError;

use crate::traits::{CacheBackend, CacheResult};

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Thread-safe in-memory backend.
///
/// Writes without an explicit timeout use the cache's default timeout;
/// a default of `None` keeps entries until they are deleted. Expired entries
/// are dropped when read, and every write sweeps out the rest, so keys that
/// are written once and never read again do not accumulate.
#[derive(Debug)]
pub struct InMemoryCache<V> {
    name: String,
    default_timeout: Option<Duration>,
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V> InMemoryCache<V> {
    pub fn new(name: impl Into<String>, default_timeout: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            default_timeout,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) -> CacheResult<()> {
        self.entries
            .write()
            .map_err(|_| CacheError::LockPoisoned)?
            .clear();
        Ok(())
    }
}

impl<V: Clone + Send + Sync> CacheBackend<V> for InMemoryCache<V> {
    fn get(&self, key: &str) -> CacheResult<Option<V>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }
        // Expired: remove unless a concurrent writer already refreshed it.
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: V, timeout: Option<Duration>) -> CacheResult<()> {
        let now = Instant::now();
        let expires_at = timeout
            .or(self.default_timeout)
            .and_then(|t| now.checked_add(t));
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    #[test]
    fn test_get_set_delete() {
        let cache = InMemoryCache::new("locmem", None);
        assert_eq!(cache.get("k").unwrap(), None::<String>);

        cache.set("k", "v".to_string(), None).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some("v".to_string()));

        cache.delete("k").unwrap();
        assert_eq!(cache.get("k").unwrap(), None);
        // Deleting again is fine.
        cache.delete("k").unwrap();
    }

    #[test]
    fn test_entries_expire() {
        let cache = InMemoryCache::new("locmem", Some(Duration::from_millis(10)));
        cache.set("default", 1, None).unwrap();
        cache.set("explicit", 2, Some(Duration::from_secs(60))).unwrap();

        thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.get("default").unwrap(), None);
        assert_eq!(cache.get("explicit").unwrap(), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_write_sweeps_unread_expired_entries() {
        let cache = InMemoryCache::new("locmem", None);
        for i in 0..10 {
            cache.set(&format!("short-{}", i), i, Some(Duration::from_millis(10))).unwrap();
        }
        cache.set("long", 100, Some(Duration::from_secs(60))).unwrap();
        assert_eq!(cache.len(), 11);

        thread::sleep(Duration::from_millis(20));

        cache.set("fresh", 200, None).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("long").unwrap(), Some(100));
        assert_eq!(cache.get("fresh").unwrap(), Some(200));
    }

    #[test]
    fn test_zero_timeout_never_hits() {
        let cache = InMemoryCache::new("locmem", None);
        cache.set("k", 1, Some(Duration::ZERO)).unwrap();
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn test_clear_and_name() {
        let cache = InMemoryCache::new("shared", None);
        cache.set("a", 1, None).unwrap();
        cache.set("b", 2, None).unwrap();
        assert_eq!(cache.len(), 2);
        cache.clear().unwrap();
        assert!(cache.is_empty());
        assert_eq!(CacheBackend::<i32>::name(&cache), "shared");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Set(u8, i32),
        Delete(u8),
        Get(u8),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..8, any::<i32>()).prop_map(|(k, v)| Op::Set(k, v)),
            (0u8..8).prop_map(Op::Delete),
            (0u8..8).prop_map(Op::Get),
        ]
    }

    proptest! {
        #[test]
        fn prop_matches_map_model(ops in prop::collection::vec(arb_op(), 0..64)) {
            let cache = InMemoryCache::new("locmem", None);
            let mut model = std::collections::HashMap::new();
            for op in ops {
                match op {
                    Op::Set(k, v) => {
                        cache.set(&k.to_string(), v, None).unwrap();
                        model.insert(k, v);
                    }
                    Op::Delete(k) => {
                        cache.delete(&k.to_string()).unwrap();
                        model.remove(&k);
                    }
                    Op::Get(k) => {
                        prop_assert_eq!(cache.get(&k.to_string()).unwrap(), model.get(&k).copied());
                    }
                }
            }
            prop_assert_eq!(cache.len(), model.len());
        }
    }
}
