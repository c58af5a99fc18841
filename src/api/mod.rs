//! Chat API client.
//!
//! Everything the bot asks of the chat platform goes through the [`ChatApi`]
//! trait. Handlers and the access resolver only see these plain types, which
//! keeps them testable without a live Telegram connection.
//!
//! - `telegram` - teloxide-backed implementation (with Throttle)
//! - `fake` - recording implementation used by tests

#[cfg(test)]
pub mod fake;
mod telegram;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teloxide::types::Update;
use url::Url;

pub use telegram::TelegramApi;

/// A chat platform user, as seen in updates and member lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: u64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl UserRef {
    /// `@username` when the user has one, otherwise the first name.
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(username) => format!("@{}", username),
            None => self.first_name.clone(),
        }
    }
}

/// Membership status of a user in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MemberStatus {
    /// Creator, administrator or plain member.
    pub fn is_group_member(self) -> bool {
        matches!(self, Self::Creator | Self::Administrator | Self::Member)
    }

    /// Whether the user is physically in the chat (restricted users included).
    pub fn is_present(self) -> bool {
        self.is_group_member() || self == Self::Restricted
    }
}

/// Result of a member lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMemberInfo {
    pub user: UserRef,
    pub status: MemberStatus,
}

/// Permission sets the bot applies with `restrict_chat_member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberPermissions {
    /// Cannot send anything.
    Muted,
    /// Ordinary member rights.
    Default,
}

/// How the text of an outgoing message is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Html,
    Plain,
}

/// Inline keyboard button that carries callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackButton {
    pub text: String,
    pub data: String,
}

impl CallbackButton {
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// A message the bot wants to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    pub format: TextFormat,
    pub reply_to: Option<i32>,
    pub keyboard: Vec<Vec<CallbackButton>>,
}

impl OutgoingMessage {
    /// HTML formatted message. Callers escape user-provided text.
    pub fn html(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            format: TextFormat::Html,
            reply_to: None,
            keyboard: Vec::new(),
        }
    }

    /// Message sent verbatim.
    pub fn plain(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            format: TextFormat::Plain,
            ..Self::html(chat_id, text)
        }
    }

    #[must_use]
    pub fn reply_to(mut self, message_id: i32) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    #[must_use]
    pub fn keyboard(mut self, rows: Vec<Vec<CallbackButton>>) -> Self {
        self.keyboard = rows;
        self
    }
}

/// Failures reported by the chat platform.
///
/// The variants let callers tell a definitive answer ("no such user") from a
/// transient one (network, rate limit, timeout).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChatApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("api error: {0}")]
    Api(String),
}

pub type ApiResult<T> = Result<T, ChatApiError>;

/// Operations consumed from the chat platform.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// The bot's own account.
    async fn get_me(&self) -> ApiResult<UserRef>;

    async fn get_chat_member(&self, chat_id: i64, user_id: u64) -> ApiResult<ChatMemberInfo>;

    async fn get_chat_administrators(&self, chat_id: i64) -> ApiResult<Vec<ChatMemberInfo>>;

    /// Returns the id of the sent message.
    async fn send_message(&self, message: OutgoingMessage) -> ApiResult<i32>;

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> ApiResult<()>;

    async fn restrict_chat_member(
        &self,
        chat_id: i64,
        user_id: u64,
        permissions: MemberPermissions,
        until: Option<DateTime<Utc>>,
    ) -> ApiResult<()>;

    /// Copies a message without a forward header. Returns the new message id.
    async fn copy_message(&self, to_chat: i64, from_chat: i64, message_id: i32) -> ApiResult<i32>;

    async fn answer_callback_query(&self, query_id: &str, text: Option<&str>) -> ApiResult<()>;

    async fn set_webhook(&self, url: &Url) -> ApiResult<()>;

    async fn delete_webhook(&self) -> ApiResult<()>;

    /// Long-poll for updates with an id of at least `offset`.
    async fn get_updates(&self, offset: i64, timeout_secs: u32) -> ApiResult<Vec<Update>>;
}
