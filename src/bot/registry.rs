//! Running bot instances, addressable by webhook token.

use std::collections::HashMap;
use std::sync::Arc;

use super::BotInstance;

/// All bot instances of this process. Built at startup, read-only after.
#[derive(Default)]
pub struct BotRegistry {
    by_token: HashMap<String, Arc<BotInstance>>,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instance: Arc<BotInstance>) {
        self.by_token.insert(instance.token.clone(), instance);
    }

    pub fn by_token(&self, token: &str) -> Option<Arc<BotInstance>> {
        self.by_token.get(token).cloned()
    }

    pub fn instances(&self) -> impl Iterator<Item = &Arc<BotInstance>> {
        self.by_token.values()
    }
}
