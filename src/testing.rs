//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::api::fake::{FakeChatApi, BOT_USERNAME, BOT_USER_ID};
use crate::api::{ChatApi, MemberStatus, UserRef};
use crate::bot::{AppState, BotInstance, BotRegistry, BotSettings, Outcome};
use crate::cache::CacheRegistry;
use crate::config::{BotConfig, EngineConfig};
use crate::database::{MemoryStore, PointBalance, Store};
use crate::events::{
    CallbackEvent, ChatKind, EventKind, InboundEvent, MediaKind, MembershipChange, MessageEvent,
    ReplyTarget,
};

pub const GROUP: i64 = -100_123;
pub const REPO: i64 = 777;
pub const TOKEN: &str = "123456:test-token";

pub const OWNER: u64 = 1;
pub const MEMBER: u64 = 2;
pub const OTHER_MEMBER: u64 = 3;
pub const SUDO: u64 = 5;
pub const OUTSIDER: u64 = 9;

pub fn bot_config() -> BotConfig {
    BotConfig {
        id: "tertulia".to_string(),
        token: TOKEN.to_string(),
        group_id: GROUP,
        repo_chat_id: Some(REPO),
        sudo_ids: vec![SUDO],
        group_title: "Tertulia".to_string(),
        invite_link: Some("https://t.me/+tertulia".to_string()),
        point_name: "magical trinket".to_string(),
        points_name: "magical trinkets".to_string(),
    }
}

pub fn bot_user() -> UserRef {
    UserRef {
        id: BOT_USER_ID,
        is_bot: true,
        first_name: "Tertulia".to_string(),
        username: Some(BOT_USERNAME.to_string()),
    }
}

pub fn settings() -> BotSettings {
    BotSettings::new(&bot_config(), &bot_user())
}

pub fn user(id: u64) -> UserRef {
    UserRef {
        id,
        is_bot: false,
        first_name: format!("User{}", id),
        username: None,
    }
}

fn text_event(update_id: i64, chat_id: i64, from: UserRef, text: &str, reply_to: Option<ReplyTarget>) -> InboundEvent {
    InboundEvent {
        update_id,
        chat_id,
        chat_kind: if chat_id > 0 { ChatKind::Private } else { ChatKind::Supergroup },
        sender: Some(from),
        kind: EventKind::Message(MessageEvent {
            message_id: update_id as i32,
            text: Some(text.to_string()),
            reply_to,
            media: MediaKind::None,
            via_bot: false,
        }),
    }
}

/// Text message in the group; its message id equals the update id.
pub fn message(update_id: i64, from: UserRef, text: &str) -> InboundEvent {
    text_event(update_id, GROUP, from, text, None)
}

/// Text message in the sender's private chat with the bot.
pub fn private_message(update_id: i64, from: UserRef, text: &str) -> InboundEvent {
    let chat_id = from.id as i64;
    text_event(update_id, chat_id, from, text, None)
}

/// Group message replying to message `1000 + update_id` by `to`.
pub fn reply_message(update_id: i64, from: UserRef, to: UserRef, text: &str) -> InboundEvent {
    let target = ReplyTarget {
        message_id: 1000 + update_id as i32,
        from: Some(to),
    };
    text_event(update_id, GROUP, from, text, Some(target))
}

pub fn voice_message(update_id: i64, from: UserRef) -> InboundEvent {
    let mut event = message(update_id, from, "");
    if let EventKind::Message(message) = &mut event.kind {
        message.text = None;
        message.media = MediaKind::Voice;
    }
    event
}

/// Button press on group message `message_id`; the query id is `cb-<update_id>`.
pub fn callback(update_id: i64, from: UserRef, message_id: i32, data: &str) -> InboundEvent {
    InboundEvent {
        update_id,
        chat_id: GROUP,
        chat_kind: ChatKind::Supergroup,
        sender: Some(from),
        kind: EventKind::CallbackQuery(CallbackEvent {
            query_id: format!("cb-{}", update_id),
            message_id: Some(message_id),
            data: Some(data.to_string()),
        }),
    }
}

/// "Joined" service message in the group.
pub fn joined(update_id: i64, users: Vec<UserRef>) -> InboundEvent {
    InboundEvent {
        update_id,
        chat_id: GROUP,
        chat_kind: ChatKind::Supergroup,
        sender: users.first().cloned(),
        kind: EventKind::MembershipChange(MembershipChange {
            message_id: Some(update_id as i32),
            joined: users,
            left: None,
        }),
    }
}

/// "Left" service message in the group.
pub fn left(update_id: i64, user: UserRef) -> InboundEvent {
    InboundEvent {
        update_id,
        chat_id: GROUP,
        chat_kind: ChatKind::Supergroup,
        sender: Some(user.clone()),
        kind: EventKind::MembershipChange(MembershipChange {
            message_id: Some(update_id as i32),
            joined: Vec::new(),
            left: Some(user),
        }),
    }
}

/// Raw Bot API update for a group text message.
pub fn message_json(update_id: i64, from: &UserRef, text: &str) -> serde_json::Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "date": 1_700_000_000,
            "chat": { "id": GROUP, "type": "supergroup", "title": "Tertulia" },
            "from": from,
            "text": text,
        }
    })
}

/// A bot wired to a fake chat API and an in-memory store.
pub struct Harness {
    pub api: Arc<FakeChatApi>,
    pub bot: Arc<BotInstance>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_store(MemoryStore::new()).await
    }

    pub async fn with_store(store: MemoryStore) -> Self {
        let api = Arc::new(FakeChatApi::new());
        api.add_member(GROUP, OWNER, MemberStatus::Creator);
        api.add_member(GROUP, MEMBER, MemberStatus::Member);
        api.add_member(GROUP, OTHER_MEMBER, MemberStatus::Member);
        api.add_member(GROUP, SUDO, MemberStatus::Member);

        let engine_config = EngineConfig {
            lookup_timeout: Duration::from_millis(200),
            event_timeout: Duration::from_secs(5),
            ..EngineConfig::default()
        };

        let chat_api: Arc<dyn ChatApi> = api.clone();
        let store: Arc<dyn Store> = Arc::new(store);
        let bot = BotInstance::launch(
            &bot_config(),
            &engine_config,
            chat_api,
            store,
            &CacheRegistry::new(),
        )
        .await
        .expect("launch test bot");

        Self {
            api,
            bot: Arc::new(bot),
        }
    }

    pub async fn dispatch(&self, event: InboundEvent) -> Outcome {
        self.bot.engine.dispatch(event).await
    }

    pub fn state(&self) -> &AppState {
        self.bot.engine.state()
    }

    pub fn registry(&self) -> BotRegistry {
        let mut registry = BotRegistry::new();
        registry.insert(self.bot.clone());
        registry
    }

    /// Balance row of `user_id`, created on first use.
    pub async fn store_balance(&self, user_id: u64) -> PointBalance {
        self.state()
            .store
            .balance(GROUP, user_id)
            .await
            .expect("balance")
    }

    pub async fn points(&self, user_id: u64) -> u64 {
        self.store_balance(user_id).await.points
    }
}
