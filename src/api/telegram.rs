//! teloxide-backed chat API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use teloxide::adaptors::throttle::Limits;
use teloxide::adaptors::Throttle;
use teloxide::prelude::*;
use teloxide::types::{
    ChatMember, ChatMemberKind, ChatPermissions, InlineKeyboardButton, InlineKeyboardMarkup,
    MessageId, ParseMode, ReplyParameters, Update, User,
};
use teloxide::{ApiError, RequestError};
use tracing::debug;
use url::Url;

use super::{
    ApiResult, ChatApi, ChatApiError, ChatMemberInfo, MemberPermissions, MemberStatus,
    OutgoingMessage, TextFormat, UserRef,
};

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Chat API over the Telegram Bot API.
///
/// Requests go through teloxide's Throttle adaptor, which respects
/// Telegram's limits (30 msg/s globally, 1 msg/s per chat, 20 msg/min per group).
#[derive(Clone)]
pub struct TelegramApi {
    bot: ThrottledBot,
}

impl TelegramApi {
    pub fn new(token: &str) -> Self {
        Self {
            bot: Bot::new(token).throttle(Limits::default()),
        }
    }
}

impl std::fmt::Debug for TelegramApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramApi").finish_non_exhaustive()
    }
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.0,
            is_bot: user.is_bot,
            first_name: user.first_name.clone(),
            username: user.username.clone(),
        }
    }
}

impl From<&ChatMemberKind> for MemberStatus {
    fn from(kind: &ChatMemberKind) -> Self {
        if kind.is_owner() {
            Self::Creator
        } else if kind.is_administrator() {
            Self::Administrator
        } else if kind.is_restricted() {
            Self::Restricted
        } else if kind.is_member() {
            Self::Member
        } else if kind.is_banned() {
            Self::Kicked
        } else {
            Self::Left
        }
    }
}

fn member_info(member: &ChatMember) -> ChatMemberInfo {
    ChatMemberInfo {
        user: UserRef::from(&member.user),
        status: MemberStatus::from(&member.kind),
    }
}

fn permissions(set: MemberPermissions) -> ChatPermissions {
    match set {
        MemberPermissions::Muted => ChatPermissions::empty(),
        MemberPermissions::Default => {
            ChatPermissions::SEND_MESSAGES
                | ChatPermissions::SEND_AUDIOS
                | ChatPermissions::SEND_DOCUMENTS
                | ChatPermissions::SEND_PHOTOS
                | ChatPermissions::SEND_VIDEOS
                | ChatPermissions::SEND_VIDEO_NOTES
                | ChatPermissions::SEND_VOICE_NOTES
                | ChatPermissions::SEND_POLLS
                | ChatPermissions::SEND_OTHER_MESSAGES
                | ChatPermissions::ADD_WEB_PAGE_PREVIEWS
        }
    }
}

/// Sort teloxide's request errors into the categories callers act on.
fn classify(err: RequestError) -> ChatApiError {
    let text = err.to_string();
    match &err {
        RequestError::Api(
            ApiError::UserNotFound | ApiError::ChatNotFound | ApiError::MessageToDeleteNotFound,
        ) => ChatApiError::NotFound(text),
        RequestError::Api(
            ApiError::BotBlocked | ApiError::BotKicked | ApiError::NotEnoughRightsToRestrict,
        ) => ChatApiError::Forbidden(text),
        RequestError::Api(_) => ChatApiError::Api(text),
        RequestError::RetryAfter(_) => ChatApiError::RateLimited(text),
        RequestError::Network(_) | RequestError::Io(_) => ChatApiError::Transport(text),
        _ => ChatApiError::Api(text),
    }
}

#[async_trait]
impl ChatApi for TelegramApi {
    async fn get_me(&self) -> ApiResult<UserRef> {
        let me = self.bot.get_me().await.map_err(classify)?;
        Ok(UserRef::from(&me.user))
    }

    async fn get_chat_member(&self, chat_id: i64, user_id: u64) -> ApiResult<ChatMemberInfo> {
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), UserId(user_id))
            .await
            .map_err(classify)?;
        Ok(member_info(&member))
    }

    async fn get_chat_administrators(&self, chat_id: i64) -> ApiResult<Vec<ChatMemberInfo>> {
        let admins = self
            .bot
            .get_chat_administrators(ChatId(chat_id))
            .await
            .map_err(classify)?;
        Ok(admins.iter().map(member_info).collect())
    }

    async fn send_message(&self, message: OutgoingMessage) -> ApiResult<i32> {
        let mut req = self.bot.send_message(ChatId(message.chat_id), message.text);

        if message.format == TextFormat::Html {
            req = req.parse_mode(ParseMode::Html);
        }
        if let Some(reply_to) = message.reply_to {
            req = req.reply_parameters(ReplyParameters::new(MessageId(reply_to)));
        }
        if !message.keyboard.is_empty() {
            let rows = message.keyboard.into_iter().map(|row| {
                row.into_iter()
                    .map(|button| InlineKeyboardButton::callback(button.text, button.data))
                    .collect::<Vec<_>>()
            });
            req = req.reply_markup(InlineKeyboardMarkup::new(rows));
        }

        let sent = req.await.map_err(classify)?;
        Ok(sent.id.0)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> ApiResult<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn restrict_chat_member(
        &self,
        chat_id: i64,
        user_id: u64,
        set: MemberPermissions,
        until: Option<DateTime<Utc>>,
    ) -> ApiResult<()> {
        let req = self
            .bot
            .restrict_chat_member(ChatId(chat_id), UserId(user_id), permissions(set));
        let result = match until {
            Some(until) => req.until_date(until).await,
            None => req.await,
        };
        result.map_err(classify)?;
        debug!("Applied {:?} permissions to {} in {}", set, user_id, chat_id);
        Ok(())
    }

    async fn copy_message(&self, to_chat: i64, from_chat: i64, message_id: i32) -> ApiResult<i32> {
        let copied = self
            .bot
            .copy_message(ChatId(to_chat), ChatId(from_chat), MessageId(message_id))
            .await
            .map_err(classify)?;
        Ok(copied.0)
    }

    async fn answer_callback_query(&self, query_id: &str, text: Option<&str>) -> ApiResult<()> {
        let req = self.bot.answer_callback_query(query_id.to_string());
        let result = match text {
            Some(text) => req.text(text).await,
            None => req.await,
        };
        result.map_err(classify)?;
        Ok(())
    }

    async fn set_webhook(&self, url: &Url) -> ApiResult<()> {
        self.bot.set_webhook(url.clone()).await.map_err(classify)?;
        Ok(())
    }

    async fn delete_webhook(&self) -> ApiResult<()> {
        self.bot.delete_webhook().await.map_err(classify)?;
        Ok(())
    }

    async fn get_updates(&self, offset: i64, timeout_secs: u32) -> ApiResult<Vec<Update>> {
        let offset = i32::try_from(offset).unwrap_or(i32::MAX);
        self.bot
            .get_updates()
            .offset(offset)
            .timeout(timeout_secs)
            .await
            .map_err(classify)
    }
}
