//! Storage abstraction for members, points and notes.

use async_trait::async_trait;

use super::models::{GroupMember, GroupNote, PointBalance};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent state of the bot.
///
/// Roster writes are idempotent: creating a member that exists is a no-op,
/// and a member always comes with its point balance.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_member(&self, group_id: i64, user_id: u64) -> StoreResult<Option<GroupMember>>;

    /// Create the member and its zeroed balance if absent.
    /// Returns `true` when the member was created by this call.
    async fn ensure_member(&self, group_id: i64, user_id: u64) -> StoreResult<bool>;

    /// Delete the member and its balance. Returns `true` if a row was removed.
    async fn remove_member(&self, group_id: i64, user_id: u64) -> StoreResult<bool>;

    async fn list_members(&self, group_id: i64) -> StoreResult<Vec<GroupMember>>;

    /// Balance of a member, creating member and balance when missing.
    async fn balance(&self, group_id: i64, user_id: u64) -> StoreResult<PointBalance>;

    /// Overwrite an existing balance. A balance removed in the meantime stays removed.
    async fn save_balance(&self, balance: &PointBalance) -> StoreResult<()>;

    /// Highest balances first.
    async fn top_balances(&self, group_id: i64, limit: usize) -> StoreResult<Vec<PointBalance>>;

    async fn get_note(&self, group_id: i64, tag: &str) -> StoreResult<Option<GroupNote>>;

    /// Insert or replace the note with the same `(group_id, tag)`.
    async fn save_note(&self, note: &GroupNote) -> StoreResult<()>;

    async fn remove_note(&self, group_id: i64, tag: &str) -> StoreResult<bool>;

    /// Tags of the group's notes, sorted.
    async fn list_notes(&self, group_id: i64) -> StoreResult<Vec<String>>;
}
