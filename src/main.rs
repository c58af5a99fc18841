//! Tertulia - Telegram group management bot
//!
//! Members-only bot for a single language-exchange group: point tallies,
//! group notes, a welcome flow and audio-only mode, behind per-member
//! access tiers.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `api` - Chat platform client (teloxide with Throttle)
//! - `database` - Roster, points and notes (MongoDB or in-memory)
//! - `cache` - Named caches with Moka
//! - `permissions` - Access tiers with membership caching
//! - `events` - Update decoding and command parsing
//! - `bot` - Dispatch engine and the webhook/polling ingress
//! - `plugins` - Handlers
//! - `utils` - Formatting helpers

mod api;
mod bot;
mod cache;
mod config;
mod database;
mod events;
mod permissions;
mod plugins;
#[cfg(test)]
mod testing;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use api::{ChatApi, TelegramApi};
use bot::{BotInstance, BotRegistry};
use cache::CacheRegistry;
use config::Config;
use database::{MemoryStore, MongoStore, Store};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser)]
#[command(name = "tertulia", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the given bots, or every configured bot when none is named.
    Run { bot_ids: Vec<String> },
    /// List configured bots.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging with sensible defaults
    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tertulia=info,teloxide=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Loads .env before reading the environment
    let config = Config::from_env()?;
    info!("Bot mode: {:?}", config.bot_mode);

    match cli.command.unwrap_or(Command::Run { bot_ids: Vec::new() }) {
        Command::List => {
            for (id, bot) in &config.bots {
                println!("{}\tgroup {}", id, bot.group_id);
            }
            Ok(())
        }
        Command::Run { bot_ids } => run(config, bot_ids).await,
    }
}

async fn run(config: Config, bot_ids: Vec<String>) -> anyhow::Result<()> {
    info!("Starting Tertulia...");

    let store: Arc<dyn Store> = match &config.mongodb_uri {
        Some(uri) => {
            info!("Connecting to MongoDB...");
            Arc::new(MongoStore::connect(uri, &config.mongodb_database).await?)
        }
        None => {
            warn!("MONGODB_URI is not set; data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let caches = CacheRegistry::new();

    let selected: Vec<_> = if bot_ids.is_empty() {
        config.bots.values().collect()
    } else {
        bot_ids
            .iter()
            .map(|id| {
                config
                    .bots
                    .get(&id.to_lowercase())
                    .with_context(|| format!("bot '{}' is not configured", id))
            })
            .collect::<anyhow::Result<_>>()?
    };

    let mut registry = BotRegistry::new();
    for bot_config in selected {
        let api: Arc<dyn ChatApi> = Arc::new(TelegramApi::new(&bot_config.token));
        let instance = BotInstance::launch(bot_config, &config.engine, api, store.clone(), &caches)
            .await
            .with_context(|| format!("failed to start bot '{}'", bot_config.id))?;
        registry.insert(Arc::new(instance));
    }

    bot::run(&config, Arc::new(registry)).await
}
