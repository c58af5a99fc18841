//! Cache configuration.

use std::time::Duration;

use moka::policy::EvictionPolicy;

/// Configuration for a cache instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_capacity: u64,

    /// Time-to-live for cache entries.
    /// After this duration, entries are automatically evicted.
    pub ttl: Option<Duration>,

    /// Which entry goes when the cache is full.
    pub eviction_policy: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Some(Duration::from_secs(300)), // 5 minutes
            eviction_policy: EvictionPolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with the given max capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            max_capacity,
            ..Default::default()
        }
    }

    /// Set time-to-live for cache entries.
    #[must_use]
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.ttl = Some(duration);
        self
    }

    /// Resolved access tiers, checked on every event.
    /// TTL bounds how long a promotion or departure goes unnoticed.
    pub fn access_tiers(ttl: Duration) -> Self {
        Self {
            max_capacity: 50_000,
            ttl: Some(ttl),
            eviction_policy: EvictionPolicy::default(),
        }
    }

    /// Recently seen update ids.
    /// Capacity is the dedupe window; TTL only sheds a quiet bot's memory.
    /// LRU, so the newest `window` ids are always kept.
    pub fn dedupe(window: u64, ttl: Duration) -> Self {
        Self {
            max_capacity: window,
            ttl: Some(ttl),
            eviction_policy: EvictionPolicy::lru(),
        }
    }
}
