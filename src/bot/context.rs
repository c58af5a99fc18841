//! Shared state handed to every handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::api::{ChatApi, OutgoingMessage, UserRef};
use crate::config::BotConfig;
use crate::database::Store;
use crate::events::InboundEvent;
use crate::permissions::AccessResolver;

/// Per-bot settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub id: String,
    /// The bot's own account, from `getMe`.
    pub user_id: u64,
    pub username: String,
    pub first_name: String,
    /// The group this bot manages.
    pub group_id: i64,
    pub repo_chat_id: Option<i64>,
    pub group_title: String,
    pub invite_link: Option<String>,
    pub point_name: String,
    pub points_name: String,
}

impl BotSettings {
    pub fn new(config: &BotConfig, me: &UserRef) -> Self {
        Self {
            id: config.id.clone(),
            user_id: me.id,
            username: me.username.clone().unwrap_or_default(),
            first_name: me.first_name.clone(),
            group_id: config.group_id,
            repo_chat_id: config.repo_chat_id,
            group_title: config.group_title.clone(),
            invite_link: config.invite_link.clone(),
            point_name: config.point_name.clone(),
            points_name: config.points_name.clone(),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Chat platform client.
    pub api: Arc<dyn ChatApi>,

    /// Members, points and notes.
    pub store: Arc<dyn Store>,

    /// Access tiers with membership caching.
    pub access: AccessResolver,

    pub settings: Arc<BotSettings>,

    /// Audio-only mode of the group, toggled by `/audio_only`.
    pub audio_only: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        api: Arc<dyn ChatApi>,
        store: Arc<dyn Store>,
        access: AccessResolver,
        settings: BotSettings,
    ) -> Self {
        Self {
            api,
            store,
            access,
            settings: Arc::new(settings),
            audio_only: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn audio_only(&self) -> bool {
        self.audio_only.load(Ordering::Relaxed)
    }

    pub fn set_audio_only(&self, enabled: bool) {
        self.audio_only.store(enabled, Ordering::Relaxed);
    }

    /// Send HTML text to the event's chat, replying to its message.
    pub async fn reply(&self, event: &InboundEvent, text: impl Into<String>) -> anyhow::Result<i32> {
        let mut message = OutgoingMessage::html(event.chat_id, text);
        if let Some(message_id) = event.message_id() {
            message = message.reply_to(message_id);
        }
        Ok(self.api.send_message(message).await?)
    }

    /// Send HTML text to the event's chat without replying.
    pub async fn say(&self, event: &InboundEvent, text: impl Into<String>) -> anyhow::Result<i32> {
        Ok(self
            .api
            .send_message(OutgoingMessage::html(event.chat_id, text))
            .await?)
    }
}
