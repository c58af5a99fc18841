//! Access tiers.

use std::fmt;

use crate::api::MemberStatus;

/// How much a user may do with the bot, lowest first.
///
/// Derived from the user's status in the bot's group; never persisted.
/// Each tier passes every check for the tiers below it, so sudo users can
/// run owner commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessTier {
    None,
    Member,
    Owner,
    Sudo,
}

impl AccessTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Member => "member",
            Self::Owner => "owner",
            Self::Sudo => "sudo",
        }
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier for a member status.
///
/// Sudo users still have to be in the group; outside it they get nothing.
pub fn tier_for(status: MemberStatus, is_sudo: bool) -> AccessTier {
    if !status.is_group_member() {
        return AccessTier::None;
    }
    if is_sudo {
        AccessTier::Sudo
    } else if status == MemberStatus::Creator {
        AccessTier::Owner
    } else {
        AccessTier::Member
    }
}
