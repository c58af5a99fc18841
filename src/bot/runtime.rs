//! Bot runtime - Polling and Webhook runners.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::registry::BotRegistry;
use super::{webhook, BotInstance};
use crate::api::ApiResult;
use crate::config::{BotMode, Config, ConfigError};

/// Long-poll timeout passed to `getUpdates`.
const POLL_TIMEOUT_SECS: u32 = 30;

/// Pause after a failed `getUpdates` call.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(3);

/// Run all bots with the configured mode until Ctrl+C.
pub async fn run(config: &Config, registry: Arc<BotRegistry>) -> anyhow::Result<()> {
    match config.bot_mode {
        BotMode::Polling => {
            info!("Starting bots in polling mode...");
            let pollers: Vec<_> = registry
                .instances()
                .cloned()
                .map(|instance| tokio::spawn(poll(instance)))
                .collect();

            tokio::signal::ctrl_c().await?;
            info!("Shutting down pollers");
            for poller in pollers {
                poller.abort();
            }
            Ok(())
        }
        BotMode::Webhook => {
            info!("Starting bots in webhook mode...");
            let base_url = config
                .webhook_url
                .as_ref()
                .ok_or(ConfigError::WebhookUrlRequired)?;
            webhook::serve(registry, base_url, config.webhook_port).await
        }
    }
}

/// Fetch updates forever, handing each to its own task.
///
/// The offset advances past every fetched update whatever its outcome.
async fn poll(instance: Arc<BotInstance>) {
    if let Err(e) = instance.api.delete_webhook().await {
        warn!("Bot {} could not delete its webhook: {}", instance.id, e);
    }
    info!("Bot {} polling for updates", instance.id);

    let mut offset = 0_i64;
    loop {
        if let Err(e) = poll_once(&instance, &mut offset).await {
            warn!("Bot {} getUpdates failed: {}", instance.id, e);
            tokio::time::sleep(POLL_ERROR_BACKOFF).await;
        }
    }
}

/// Fetch one batch and spawn a task per update, moving `offset` past it.
async fn poll_once(instance: &Arc<BotInstance>, offset: &mut i64) -> ApiResult<Vec<JoinHandle<()>>> {
    let updates = instance.api.get_updates(*offset, POLL_TIMEOUT_SECS).await?;

    let tasks = updates
        .into_iter()
        .map(|update| {
            *offset = (*offset).max(i64::from(update.id.0) + 1);

            let instance = instance.clone();
            tokio::spawn(async move {
                let outcome = instance.engine.ingest_update(&update).await;
                debug!("Bot {} polled update {}: {:?}", instance.id, update.id.0, outcome);
            })
        })
        .collect();

    Ok(tasks)
}
