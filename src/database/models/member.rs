//! Group roster models.

use serde::{Deserialize, Serialize};

/// A user known to belong to a group (stored in `group_members`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: i64,
    pub user_id: u64,
    /// Unix timestamp of when the bot first saw the user as a member.
    pub joined_at: i64,
}

impl GroupMember {
    pub fn new(group_id: i64, user_id: u64) -> Self {
        Self {
            group_id,
            user_id,
            joined_at: chrono::Utc::now().timestamp(),
        }
    }
}
