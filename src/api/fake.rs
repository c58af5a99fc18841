//! Recording chat API for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use teloxide::types::Update;
use url::Url;

use super::{
    ApiResult, ChatApi, ChatApiError, ChatMemberInfo, MemberPermissions, MemberStatus,
    OutgoingMessage, UserRef,
};

pub const BOT_USER_ID: u64 = 4242;
pub const BOT_USERNAME: &str = "tertulia_bot";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    pub chat_id: i64,
    pub user_id: u64,
    pub permissions: MemberPermissions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedMessage {
    pub to_chat: i64,
    pub from_chat: i64,
    pub message_id: i32,
}

#[derive(Default)]
struct Recorded {
    sent: Vec<OutgoingMessage>,
    deleted: Vec<(i64, i32)>,
    restrictions: Vec<Restriction>,
    copies: Vec<CopiedMessage>,
    answered: Vec<String>,
}

/// In-memory [`ChatApi`] that records every outbound call.
#[derive(Default)]
pub struct FakeChatApi {
    members: Mutex<HashMap<(i64, u64), ChatMemberInfo>>,
    failing: Mutex<HashSet<u64>>,
    missing_messages: Mutex<HashSet<(i64, i32)>>,
    lookup_delay: Mutex<Option<Duration>>,
    lookups: AtomicUsize,
    pending_updates: Mutex<Vec<Update>>,
    next_message_id: AtomicI32,
    recorded: Mutex<Recorded>,
}

impl FakeChatApi {
    pub fn new() -> Self {
        Self {
            next_message_id: AtomicI32::new(10_000),
            ..Default::default()
        }
    }

    /// Queue an update for the next `get_updates` call.
    pub fn push_update(&self, update: Update) {
        self.pending_updates.lock().push(update);
    }

    pub fn set_member(&self, chat_id: i64, user: UserRef, status: MemberStatus) {
        self.members
            .lock()
            .insert((chat_id, user.id), ChatMemberInfo { user, status });
    }

    /// Register a user with a generated name.
    pub fn add_member(&self, chat_id: i64, user_id: u64, status: MemberStatus) -> UserRef {
        let user = UserRef {
            id: user_id,
            is_bot: false,
            first_name: format!("User{}", user_id),
            username: None,
        };
        self.set_member(chat_id, user.clone(), status);
        user
    }

    /// Lookups for this user fail with a transport error.
    pub fn fail_lookups_for(&self, user_id: u64) {
        self.failing.lock().insert(user_id);
    }

    pub fn restore_lookups_for(&self, user_id: u64) {
        self.failing.lock().remove(&user_id);
    }

    pub fn delay_lookups(&self, delay: Duration) {
        *self.lookup_delay.lock() = Some(delay);
    }

    /// Copying this message fails as if it had been deleted.
    pub fn forget_message(&self, chat_id: i64, message_id: i32) {
        self.missing_messages.lock().insert((chat_id, message_id));
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.recorded.lock().sent.clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.recorded.lock().sent.iter().map(|m| m.text.clone()).collect()
    }

    pub fn deleted(&self) -> Vec<(i64, i32)> {
        self.recorded.lock().deleted.clone()
    }

    pub fn restrictions(&self) -> Vec<Restriction> {
        self.recorded.lock().restrictions.clone()
    }

    pub fn copies(&self) -> Vec<CopiedMessage> {
        self.recorded.lock().copies.clone()
    }

    pub fn answered(&self) -> Vec<String> {
        self.recorded.lock().answered.clone()
    }

    fn next_id(&self) -> i32 {
        self.next_message_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatApi for FakeChatApi {
    async fn get_me(&self) -> ApiResult<UserRef> {
        Ok(UserRef {
            id: BOT_USER_ID,
            is_bot: true,
            first_name: "Tertulia".to_string(),
            username: Some(BOT_USERNAME.to_string()),
        })
    }

    async fn get_chat_member(&self, chat_id: i64, user_id: u64) -> ApiResult<ChatMemberInfo> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let delay = *self.lookup_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(&user_id) {
            return Err(ChatApiError::Transport("connection reset".to_string()));
        }
        self.members
            .lock()
            .get(&(chat_id, user_id))
            .cloned()
            .ok_or_else(|| ChatApiError::NotFound("user not found".to_string()))
    }

    async fn get_chat_administrators(&self, chat_id: i64) -> ApiResult<Vec<ChatMemberInfo>> {
        Ok(self
            .members
            .lock()
            .iter()
            .filter(|((chat, _), info)| {
                *chat == chat_id
                    && matches!(info.status, MemberStatus::Creator | MemberStatus::Administrator)
            })
            .map(|(_, info)| info.clone())
            .collect())
    }

    async fn send_message(&self, message: OutgoingMessage) -> ApiResult<i32> {
        self.recorded.lock().sent.push(message);
        Ok(self.next_id())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> ApiResult<()> {
        self.recorded.lock().deleted.push((chat_id, message_id));
        Ok(())
    }

    async fn restrict_chat_member(
        &self,
        chat_id: i64,
        user_id: u64,
        permissions: MemberPermissions,
        _until: Option<DateTime<Utc>>,
    ) -> ApiResult<()> {
        self.recorded.lock().restrictions.push(Restriction {
            chat_id,
            user_id,
            permissions,
        });
        Ok(())
    }

    async fn copy_message(&self, to_chat: i64, from_chat: i64, message_id: i32) -> ApiResult<i32> {
        if self.missing_messages.lock().contains(&(from_chat, message_id)) {
            return Err(ChatApiError::Api("message to copy not found".to_string()));
        }
        self.recorded.lock().copies.push(CopiedMessage {
            to_chat,
            from_chat,
            message_id,
        });
        Ok(self.next_id())
    }

    async fn answer_callback_query(&self, query_id: &str, _text: Option<&str>) -> ApiResult<()> {
        self.recorded.lock().answered.push(query_id.to_string());
        Ok(())
    }

    async fn set_webhook(&self, _url: &Url) -> ApiResult<()> {
        Ok(())
    }

    async fn delete_webhook(&self) -> ApiResult<()> {
        Ok(())
    }

    async fn get_updates(&self, offset: i64, _timeout_secs: u32) -> ApiResult<Vec<Update>> {
        let mut pending = self.pending_updates.lock();
        pending.retain(|update| i64::from(update.id.0) >= offset);
        Ok(std::mem::take(&mut *pending))
    }
}
