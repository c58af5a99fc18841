//! Bot module - Core bot functionality.
//!
//! - `engine` - dedupe, access checks and handler execution
//! - `router` - handler registrations and matching
//! - `registry` - running instances by token
//! - `runtime` / `webhook` - the two ingress adapters

mod context;
mod dedupe;
mod engine;
mod locks;
mod registry;
mod router;
mod runtime;
pub mod webhook;

use std::sync::Arc;

use tracing::info;

use crate::api::ChatApi;
use crate::cache::CacheRegistry;
use crate::config::{BotConfig, EngineConfig};
use crate::database::Store;
use crate::permissions::AccessResolver;
use crate::plugins;

use dedupe::Deduplicator;

pub use context::{AppState, BotSettings};
pub use engine::{Engine, Outcome};
pub use locks::AggregateKey;
pub use registry::BotRegistry;
pub use router::{endpoint, HandlerRegistration, Predicate};
pub use runtime::run;

/// One configured bot: its token, client and dispatch engine.
pub struct BotInstance {
    pub id: String,
    pub token: String,
    pub api: Arc<dyn ChatApi>,
    pub engine: Engine,
}

impl BotInstance {
    /// Ask the platform who we are and wire up the engine.
    pub async fn launch(
        config: &BotConfig,
        engine_config: &EngineConfig,
        api: Arc<dyn ChatApi>,
        store: Arc<dyn Store>,
        caches: &CacheRegistry,
    ) -> anyhow::Result<Self> {
        let me = api.get_me().await?;
        let settings = BotSettings::new(config, &me);
        info!(
            "Bot {} is @{} managing group {}",
            config.id, settings.username, settings.group_id
        );

        let access = AccessResolver::new(
            api.clone(),
            store.clone(),
            caches,
            &format!("access_tiers:{}", config.id),
            engine_config.access_cache_ttl,
            engine_config.lookup_timeout,
            &config.sudo_ids,
        )?;
        let dedupe = Deduplicator::new(
            caches,
            &format!("dedupe:{}", config.id),
            engine_config.dedupe_window,
            engine_config.dedupe_ttl,
        )?;

        let state = AppState::new(api.clone(), store, access, settings);
        let engine = Engine::new(
            state,
            plugins::registrations(),
            dedupe,
            engine_config.event_timeout,
        );

        Ok(Self {
            id: config.id.clone(),
            token: config.token.clone(),
            api,
            engine,
        })
    }
}
