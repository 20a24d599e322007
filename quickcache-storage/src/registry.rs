//! Named backends and tier layouts loaded from configuration.
//!
//! ```toml
//! [[tiers]]
//! cache = "locmem"
//! timeout_secs = 10
//! session_scoped = true
//!
//! [[tiers]]
//! cache = "default"
//! timeout_secs = 300
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use quickcache_core::ConfigError;
use serde::{Deserialize, Serialize};

use crate::tier::PrefixFn;
use crate::tiered::{TierPreset, TieredCache};
use crate::traits::CacheBackend;

/// One tier in a configured layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Registered backend name.
    pub cache: String,
    /// Write timeout in seconds. Absent or zero disables the tier.
    #[serde(default)]
    pub timeout_secs: Option<f64>,
    /// Prefix this tier's keys with the session prefix.
    #[serde(default)]
    pub session_scoped: bool,
}

impl TierConfig {
    pub fn timeout(&self) -> Result<Option<Duration>, ConfigError> {
        self.timeout_secs
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidPresets {
                    reason: format!("timeout_secs for \"{}\": {}", self.cache, e),
                })
            })
            .transpose()
    }
}

/// Ordered tier layout, fastest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TieredConfig {
    #[serde(default)]
    pub tiers: Vec<TierConfig>,
}

impl TieredConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::InvalidPresets {
            reason: e.to_string(),
        })
    }
}

/// Backends addressable by name.
pub struct CacheRegistry<V> {
    caches: HashMap<String, Arc<dyn CacheBackend<V>>>,
}

impl<V> Default for CacheRegistry<V> {
    fn default() -> Self {
        Self {
            caches: HashMap::new(),
        }
    }
}

impl<V> fmt::Debug for CacheRegistry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.caches.keys().collect();
        names.sort();
        f.debug_struct("CacheRegistry").field("caches", &names).finish()
    }
}

impl<V> CacheRegistry<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, replacing any previous one with the same name.
    pub fn register(mut self, name: impl Into<String>, backend: Arc<dyn CacheBackend<V>>) -> Self {
        self.caches.insert(name.into(), backend);
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn CacheBackend<V>>, ConfigError> {
        self.caches
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownCache {
                name: name.to_string(),
            })
    }

    /// Build a tiered cache from a layout. Every named backend must be
    /// registered, even those whose tier ends up disabled.
    pub fn tiered(
        &self,
        config: &TieredConfig,
        session_prefix: Option<PrefixFn>,
    ) -> Result<TieredCache<V>, ConfigError> {
        let presets = config
            .tiers
            .iter()
            .map(|tier| -> Result<TierPreset<V>, ConfigError> {
                let prefix = if tier.session_scoped {
                    session_prefix.clone()
                } else {
                    None
                };
                Ok((self.get(&tier.cache)?, tier.timeout()?, prefix))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TieredCache::from_presets(presets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryCache;

    const LAYOUT: &str = r#"
        [[tiers]]
        cache = "locmem"
        timeout_secs = 10
        session_scoped = true

        [[tiers]]
        cache = "default"
        timeout_secs = 300.5

        [[tiers]]
        cache = "disabled"
    "#;

    fn registry() -> CacheRegistry<String> {
        CacheRegistry::<String>::new()
            .register("locmem", Arc::new(InMemoryCache::<String>::new("locmem", None)))
            .register("default", Arc::new(InMemoryCache::<String>::new("default", None)))
            .register("disabled", Arc::new(InMemoryCache::<String>::new("disabled", None)))
    }

    #[test]
    fn test_parse_layout() {
        let config = TieredConfig::from_toml_str(LAYOUT).unwrap();
        assert_eq!(config.tiers.len(), 3);
        assert!(config.tiers[0].session_scoped);
        assert_eq!(
            config.tiers[0].timeout().unwrap(),
            Some(Duration::from_secs(10))
        );
        assert_eq!(
            config.tiers[1].timeout().unwrap(),
            Some(Duration::from_millis(300_500))
        );
        assert_eq!(config.tiers[2].timeout().unwrap(), None);
    }

    #[test]
    fn test_registry_builds_tiers() {
        let config = TieredConfig::from_toml_str(LAYOUT).unwrap();
        let session: PrefixFn = Arc::new(|| "req-1:".to_string());
        let cache = registry().tiered(&config, Some(session)).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.tiers()[0].prefixed_key("k"), "req-1:k");
        assert_eq!(cache.tiers()[1].prefixed_key("k"), "k");
    }

    #[test]
    fn test_unknown_cache_name() {
        let config = TieredConfig::from_toml_str(
            r#"
            [[tiers]]
            cache = "redis"
            timeout_secs = 5
            "#,
        )
        .unwrap();
        let err = registry().tiered(&config, None).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownCache {
                name: "redis".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_layouts() {
        assert!(matches!(
            TieredConfig::from_toml_str("tiers = 3"),
            Err(ConfigError::InvalidPresets { .. })
        ));

        let negative = TierConfig {
            cache: "locmem".to_string(),
            timeout_secs: Some(-1.0),
            session_scoped: false,
        };
        assert!(matches!(
            negative.timeout(),
            Err(ConfigError::InvalidPresets { .. })
        ));
    }
}
