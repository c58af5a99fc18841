//! Cache module - Modular caching system using Moka.
//!
//! The registry holds every named cache in the process. Each bot instance
//! asks it for its own caches:
//! - `access_tiers:<bot>` - resolved [`AccessTier`](crate::permissions::AccessTier) per user
//! - `dedupe:<bot>` - update ids seen recently
//!
//! ```ignore
//! let tiers = registry.get_or_create::<u64, AccessTier>("access_tiers:main", CacheConfig::access_tiers(ttl))?;
//! tiers.insert(user_id, AccessTier::Member);
//! ```

mod config;
mod registry;
mod typed;

pub use config::CacheConfig;
pub use registry::{CacheRegistry, CacheTypeMismatch};
pub use typed::TypedCache;
