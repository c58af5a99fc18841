//! In-memory store.
//!
//! Used when no MongoDB is configured, and by tests.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::models::{GroupMember, GroupNote, PointBalance};
use super::store::{Store, StoreResult};

#[derive(Default)]
struct Tables {
    members: BTreeMap<(i64, u64), GroupMember>,
    balances: BTreeMap<(i64, u64), PointBalance>,
    notes: BTreeMap<(i64, String), GroupNote>,
}

impl Tables {
    fn ensure_member(&mut self, group_id: i64, user_id: u64) -> bool {
        let key = (group_id, user_id);
        self.balances
            .entry(key)
            .or_insert_with(|| PointBalance::new(group_id, user_id));
        if self.members.contains_key(&key) {
            return false;
        }
        self.members.insert(key, GroupMember::new(group_id, user_id));
        true
    }
}

/// Store backed by process memory. Lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// Artificial delay on balance reads and writes.
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every balance read and write, widening race windows in tests.
    #[cfg(test)]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_member(&self, group_id: i64, user_id: u64) -> StoreResult<Option<GroupMember>> {
        Ok(self.tables.lock().members.get(&(group_id, user_id)).cloned())
    }

    async fn ensure_member(&self, group_id: i64, user_id: u64) -> StoreResult<bool> {
        Ok(self.tables.lock().ensure_member(group_id, user_id))
    }

    async fn remove_member(&self, group_id: i64, user_id: u64) -> StoreResult<bool> {
        let mut tables = self.tables.lock();
        tables.balances.remove(&(group_id, user_id));
        Ok(tables.members.remove(&(group_id, user_id)).is_some())
    }

    async fn list_members(&self, group_id: i64) -> StoreResult<Vec<GroupMember>> {
        Ok(self
            .tables
            .lock()
            .members
            .values()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn balance(&self, group_id: i64, user_id: u64) -> StoreResult<PointBalance> {
        let balance = {
            let mut tables = self.tables.lock();
            tables.ensure_member(group_id, user_id);
            tables.balances.get(&(group_id, user_id)).cloned()
        };
        self.pause().await;
        Ok(balance.unwrap_or_else(|| PointBalance::new(group_id, user_id)))
    }

    async fn save_balance(&self, balance: &PointBalance) -> StoreResult<()> {
        self.pause().await;
        if let Some(stored) = self
            .tables
            .lock()
            .balances
            .get_mut(&(balance.group_id, balance.user_id))
        {
            *stored = balance.clone();
        }
        Ok(())
    }

    async fn top_balances(&self, group_id: i64, limit: usize) -> StoreResult<Vec<PointBalance>> {
        let mut balances: Vec<PointBalance> = self
            .tables
            .lock()
            .balances
            .values()
            .filter(|b| b.group_id == group_id)
            .cloned()
            .collect();
        balances.sort_by(|a, b| b.points.cmp(&a.points));
        balances.truncate(limit);
        Ok(balances)
    }

    async fn get_note(&self, group_id: i64, tag: &str) -> StoreResult<Option<GroupNote>> {
        Ok(self
            .tables
            .lock()
            .notes
            .get(&(group_id, tag.to_string()))
            .cloned())
    }

    async fn save_note(&self, note: &GroupNote) -> StoreResult<()> {
        self.tables
            .lock()
            .notes
            .insert((note.group_id, note.tag.clone()), note.clone());
        Ok(())
    }

    async fn remove_note(&self, group_id: i64, tag: &str) -> StoreResult<bool> {
        Ok(self
            .tables
            .lock()
            .notes
            .remove(&(group_id, tag.to_string()))
            .is_some())
    }

    async fn list_notes(&self, group_id: i64) -> StoreResult<Vec<String>> {
        Ok(self
            .tables
            .lock()
            .notes
            .keys()
            .filter(|(group, _)| *group == group_id)
            .map(|(_, tag)| tag.clone())
            .collect())
    }
}
