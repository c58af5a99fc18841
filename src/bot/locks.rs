//! Per-aggregate async locks.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Idle locks are dropped once the map grows past this size.
const PRUNE_THRESHOLD: usize = 1_024;

/// A record whose read-modify-write must not interleave.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AggregateKey {
    Balance { group_id: i64, user_id: u64 },
    Note { group_id: i64, tag: String },
}

/// Keyed mutexes. Handlers holding different keys never wait on each other.
#[derive(Clone, Default)]
pub struct AggregateLocks {
    locks: Arc<DashMap<AggregateKey, Arc<Mutex<()>>>>,
}

impl AggregateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Released when the guard drops.
    pub async fn lock(&self, key: AggregateKey) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(key).or_default().clone();
        self.prune();
        mutex.lock_owned().await
    }

    /// Drop locks nobody holds or waits on.
    fn prune(&self) {
        if self.locks.len() > PRUNE_THRESHOLD {
            self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}
