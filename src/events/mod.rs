//! Inbound events.
//!
//! Every delivery from the chat platform, whether it arrives through the
//! webhook or the poll loop, is decoded into one [`InboundEvent`] before it
//! reaches the dispatch engine.

mod command;
mod update;

use crate::api::UserRef;

pub use command::{parse_command, CommandInvocation};
pub use update::{decode_update, event_from_update, DecodeError};

/// Kind of chat the event happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// Media attached to a message, as far as handlers care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    None,
    Voice,
    Audio,
    Photo,
    Other,
}

/// The message a message replies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    pub message_id: i32,
    pub from: Option<UserRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub message_id: i32,
    pub text: Option<String>,
    pub reply_to: Option<ReplyTarget>,
    pub media: MediaKind,
    pub via_bot: bool,
}

/// Users joining or leaving the chat.
///
/// `message_id` is set when the change came as a service message, which
/// the bot may delete afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipChange {
    pub message_id: Option<i32>,
    pub joined: Vec<UserRef>,
    pub left: Option<UserRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackEvent {
    pub query_id: String,
    pub message_id: Option<i32>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Message(MessageEvent),
    MembershipChange(MembershipChange),
    CallbackQuery(CallbackEvent),
}

/// Discriminant of [`EventKind`], used by the router's event-kind predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    Message,
    MembershipChange,
    CallbackQuery,
}

impl EventKind {
    pub fn tag(&self) -> EventTag {
        match self {
            Self::Message(_) => EventTag::Message,
            Self::MembershipChange(_) => EventTag::MembershipChange,
            Self::CallbackQuery(_) => EventTag::CallbackQuery,
        }
    }
}

/// One delivery from the chat platform. Never mutated after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub update_id: i64,
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    pub sender: Option<UserRef>,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn message(&self) -> Option<&MessageEvent> {
        match &self.kind {
            EventKind::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn membership(&self) -> Option<&MembershipChange> {
        match &self.kind {
            EventKind::MembershipChange(change) => Some(change),
            _ => None,
        }
    }

    pub fn callback(&self) -> Option<&CallbackEvent> {
        match &self.kind {
            EventKind::CallbackQuery(query) => Some(query),
            _ => None,
        }
    }

    /// Text of a plain message, if any.
    pub fn text(&self) -> Option<&str> {
        self.message().and_then(|m| m.text.as_deref())
    }

    /// The command in the message text, if it starts with `/`.
    pub fn command(&self) -> Option<CommandInvocation<'_>> {
        self.text().and_then(parse_command)
    }

    /// Id of the message that triggered this event, when there is one.
    pub fn message_id(&self) -> Option<i32> {
        match &self.kind {
            EventKind::Message(message) => Some(message.message_id),
            EventKind::MembershipChange(change) => change.message_id,
            EventKind::CallbackQuery(query) => query.message_id,
        }
    }
}
