//! Access control.
//!
//! Every event's sender is resolved to an [`AccessTier`] against the bot's
//! group before any handler runs. Handlers declare the tier they need; the
//! dispatch engine compares the two.
//!
//! - Cached membership lookups (reduces API hits)
//! - Fail-closed on upstream errors and timeouts
//! - Sudo list applies to group members only

mod resolver;
mod tier;

pub use resolver::AccessResolver;
pub use tier::{tier_for, AccessTier};
