//! Update deduplication.

use std::time::Duration;

use crate::cache::{CacheConfig, CacheRegistry, CacheTypeMismatch, TypedCache};

/// Remembers recently seen update ids so a redelivered update runs once.
///
/// The window is bounded by capacity and TTL; an id that fell out of it is
/// treated as new.
#[derive(Clone)]
pub struct Deduplicator {
    seen: TypedCache<i64, ()>,
}

impl Deduplicator {
    pub fn new(
        cache_registry: &CacheRegistry,
        cache_name: &str,
        window: u64,
        ttl: Duration,
    ) -> Result<Self, CacheTypeMismatch> {
        Ok(Self {
            seen: cache_registry.get_or_create(cache_name, CacheConfig::dedupe(window, ttl))?,
        })
    }

    /// Record the id. `true` only for the first delivery.
    pub fn first_delivery(&self, update_id: i64) -> bool {
        self.seen.insert_if_absent(update_id, ())
    }
}
