//! Access resolution with caching.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use super::tier::{tier_for, AccessTier};
use crate::api::{ChatApi, ChatApiError, MemberStatus};
use crate::cache::{CacheConfig, CacheRegistry, CacheTypeMismatch, TypedCache};
use crate::database::Store;

/// Cache key for tier lookups.
type TierCacheKey = (i64, u64); // (group_id, user_id)

/// Wait before a background refresh retries a failed lookup.
const REFRESH_DELAY: Duration = Duration::from_secs(1);

/// Resolves a user's [`AccessTier`] in a group.
///
/// Successful lookups are cached; failures are not, so the next event asks
/// again. Upstream errors and timeouts resolve to [`AccessTier::None`].
#[derive(Clone)]
pub struct AccessResolver {
    api: Arc<dyn ChatApi>,
    store: Arc<dyn Store>,
    cache: TypedCache<TierCacheKey, AccessTier>,
    sudo_ids: Arc<[u64]>,
    lookup_timeout: Duration,
    refresh_delay: Duration,
    /// Keys with a background refresh in flight.
    refreshing: Arc<DashMap<TierCacheKey, ()>>,
}

impl AccessResolver {
    pub fn new(
        api: Arc<dyn ChatApi>,
        store: Arc<dyn Store>,
        cache_registry: &CacheRegistry,
        cache_name: &str,
        ttl: Duration,
        lookup_timeout: Duration,
        sudo_ids: &[u64],
    ) -> Result<Self, CacheTypeMismatch> {
        let cache = cache_registry.get_or_create(cache_name, CacheConfig::access_tiers(ttl))?;

        Ok(Self {
            api,
            store,
            cache,
            sudo_ids: sudo_ids.into(),
            lookup_timeout,
            refresh_delay: REFRESH_DELAY,
            refreshing: Arc::new(DashMap::new()),
        })
    }

    #[cfg(test)]
    fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Resolve the tier of `user_id` in `group_id`. Never fails.
    pub async fn resolve(&self, group_id: i64, user_id: u64) -> AccessTier {
        let key = (group_id, user_id);

        // Check cache first
        if let Some(tier) = self.cache.get(&key) {
            debug!("Access cache hit for user {} in {}: {}", user_id, group_id, tier);
            return tier;
        }

        debug!("Access cache miss for user {} in {}", user_id, group_id);

        match self.lookup(group_id, user_id).await {
            Ok(tier) => tier,
            Err(e) => {
                warn!(
                    "Access lookup for user {} in {} failed, denying: {}",
                    user_id, group_id, e
                );
                self.schedule_refresh(key);
                AccessTier::None
            }
        }
    }

    /// Drop a cached tier, e.g. after the user joined, left or was unmuted.
    pub fn invalidate(&self, group_id: i64, user_id: u64) {
        self.cache.invalidate(&(group_id, user_id));
    }

    /// Ask the chat API, cache the answer and heal the roster.
    async fn lookup(&self, group_id: i64, user_id: u64) -> Result<AccessTier, ChatApiError> {
        let status = match tokio::time::timeout(
            self.lookup_timeout,
            self.api.get_chat_member(group_id, user_id),
        )
        .await
        {
            Ok(Ok(member)) => member.status,
            // Users the platform has never seen in the chat are simply not members.
            Ok(Err(ChatApiError::NotFound(_))) => MemberStatus::Left,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(ChatApiError::Timeout(self.lookup_timeout)),
        };

        let tier = tier_for(status, self.sudo_ids.contains(&user_id));

        if status.is_group_member() {
            match self.store.ensure_member(group_id, user_id).await {
                Ok(true) => debug!("Recorded member {} of {}", user_id, group_id),
                Ok(false) => {}
                Err(e) => warn!("Failed to record member {} of {}: {}", user_id, group_id, e),
            }
        }

        self.cache.insert((group_id, user_id), tier);
        Ok(tier)
    }

    /// Retry a failed lookup in the background, at most one per key.
    fn schedule_refresh(&self, key: TierCacheKey) {
        match self.refreshing.entry(key) {
            Entry::Occupied(_) => return,
            Entry::Vacant(slot) => {
                slot.insert(());
            }
        }

        let resolver = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(resolver.refresh_delay).await;
            let result = resolver.lookup(key.0, key.1).await;
            resolver.refreshing.remove(&key);
            match result {
                Ok(tier) => debug!("Refreshed access of user {} in {}: {}", key.1, key.0, tier),
                Err(e) => debug!("Access refresh of user {} in {} failed: {}", key.1, key.0, e),
            }
        });
    }

    #[cfg(test)]
    fn is_refreshing(&self, group_id: i64, user_id: u64) -> bool {
        self.refreshing.contains_key(&(group_id, user_id))
    }
}
