//! Typed cache wrapper around Moka.

use std::hash::Hash;
use std::sync::Arc;

use moka::sync::Cache;

use super::CacheConfig;

/// A typed cache wrapper that provides a clean API over Moka.
///
/// This cache is:
/// - Thread-safe (uses Arc internally)
/// - Bounded with optional TTL
/// - Clone-friendly (cloning is cheap, shares the same underlying cache)
pub struct TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Cache<K, V>>,
    name: Arc<str>,
}

// Manual Clone implementation that doesn't require K: Clone, V: Clone
impl<K, V> Clone for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            name: Arc::clone(&self.name),
        }
    }
}

impl<K, V> TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a new typed cache with the given name and config.
    pub fn new(name: impl Into<Arc<str>>, config: CacheConfig) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(config.max_capacity)
            .eviction_policy(config.eviction_policy);

        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            inner: Arc::new(builder.build()),
            name: name.into(),
        }
    }

    /// Insert a key-value pair into the cache.
    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    /// Insert only if the key is not cached yet.
    ///
    /// Returns `true` for the single caller whose value was stored. Concurrent
    /// callers racing on the same key are coalesced by Moka, so exactly one
    /// of them sees `true`.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        self.inner.entry(key).or_insert(value).is_fresh()
    }

    /// Get a value from the cache.
    ///
    /// Returns `Some(value)` if the key exists and hasn't expired.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    /// Remove a key from the cache.
    pub fn invalidate(&self, key: &K) {
        self.inner.invalidate(key);
    }

    /// Get the number of entries in the cache.
    ///
    /// Note: This may not be perfectly accurate due to concurrent operations.
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl<K, V> std::fmt::Debug for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCache")
            .field("name", &self.name)
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_insert_if_absent_only_first_wins() {
        let cache: TypedCache<i64, ()> = TypedCache::new("seen", CacheConfig::with_capacity(16));

        assert!(cache.insert_if_absent(1, ()));
        assert!(!cache.insert_if_absent(1, ()));
        assert!(cache.insert_if_absent(2, ()));
        assert_eq!(cache.entry_count(), 2);
    }

    #[test]
    fn test_invalidate_allows_reinsert() {
        let cache: TypedCache<(i64, u64), u8> = TypedCache::new(
            "tiers",
            CacheConfig::with_capacity(16).ttl(Duration::from_secs(60)),
        );

        cache.insert((1, 2), 7);
        assert_eq!(cache.get(&(1, 2)), Some(7));
        cache.invalidate(&(1, 2));
        assert_eq!(cache.get(&(1, 2)), None);
        assert!(cache.insert_if_absent((1, 2), 8));
    }
}
