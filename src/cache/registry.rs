//! Cache registry - Central management for all caches.

use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{CacheConfig, TypedCache};

/// A cache name was reused with different key/value types.
#[derive(Debug, thiserror::Error)]
#[error("cache '{name}' already exists as {existing}, requested {requested}")]
pub struct CacheTypeMismatch {
    pub name: String,
    pub existing: &'static str,
    pub requested: &'static str,
}

/// Central registry for managing multiple typed caches.
///
/// Each bot instance registers its caches under its own prefix
/// (`access_tiers:<bot>`, `dedupe:<bot>`), so one registry serves the
/// whole process.
#[derive(Clone, Default)]
pub struct CacheRegistry {
    caches: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

/// Internal cache entry storing type-erased cache.
struct CacheEntry {
    cache: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl CacheRegistry {
    /// Create a new empty cache registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an existing cache or create a new one if it doesn't exist.
    ///
    /// The config is only used when the cache is created.
    pub fn get_or_create<K, V>(
        &self,
        name: &str,
        config: CacheConfig,
    ) -> Result<TypedCache<K, V>, CacheTypeMismatch>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let mut caches = self.caches.write();

        if let Some(existing) = caches.get(name) {
            return existing
                .cache
                .downcast_ref::<TypedCache<K, V>>()
                .cloned()
                .ok_or_else(|| CacheTypeMismatch {
                    name: name.to_string(),
                    existing: existing.type_name,
                    requested: std::any::type_name::<TypedCache<K, V>>(),
                });
        }

        debug!("Creating cache: {}", name);
        let cache = TypedCache::new(name, config);

        caches.insert(
            name.to_string(),
            CacheEntry {
                cache: Box::new(cache.clone()),
                type_name: std::any::type_name::<TypedCache<K, V>>(),
            },
        );

        Ok(cache)
    }

    /// Get a list of all registered cache names.
    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether a cache with this name is registered with these types.
    #[cfg(test)]
    fn holds<K, V>(&self, name: &str) -> bool
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.caches
            .read()
            .get(name)
            .map(|entry| entry.cache.is::<TypedCache<K, V>>())
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let caches = self.caches.read();
        f.debug_struct("CacheRegistry")
            .field("cache_count", &caches.len())
            .field("cache_names", &caches.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_shares_cache() {
        let registry = CacheRegistry::new();
        let a: TypedCache<i64, String> = registry
            .get_or_create("notes", CacheConfig::default())
            .unwrap();
        let b: TypedCache<i64, String> = registry
            .get_or_create("notes", CacheConfig::default())
            .unwrap();

        a.insert(1, "hello".to_string());
        assert_eq!(b.get(&1).as_deref(), Some("hello"));
        assert!(registry.holds::<i64, String>("notes"));
        assert_eq!(registry.cache_names(), vec!["notes".to_string()]);
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let registry = CacheRegistry::new();
        let _: TypedCache<i64, String> = registry
            .get_or_create("notes", CacheConfig::default())
            .unwrap();

        let err = registry
            .get_or_create::<i64, u32>("notes", CacheConfig::default())
            .unwrap_err();
        assert_eq!(err.name, "notes");
    }
}
