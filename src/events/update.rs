//! Mapping Bot API updates onto [`InboundEvent`].
//!
//! Webhook bodies and polled updates both go through teloxide's [`Update`]
//! type, so the two ingress paths cannot drift apart.

use teloxide::types::{CallbackQuery, Chat, ChatMemberUpdated, Message, Update, UpdateKind};

use super::{
    CallbackEvent, ChatKind, EventKind, InboundEvent, MediaKind, MembershipChange, MessageEvent,
    ReplyTarget,
};
use crate::api::UserRef;

/// The payload was not a Bot API update.
#[derive(Debug, thiserror::Error)]
#[error("malformed update payload: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// Decode a raw webhook body.
///
/// `Ok(None)` means a well-formed update of a kind the bot does not handle.
pub fn decode_update(raw: &[u8]) -> Result<Option<InboundEvent>, DecodeError> {
    let update: Update = serde_json::from_slice(raw)?;
    Ok(event_from_update(&update))
}

/// Map an update onto the event handlers see, if the bot handles its kind.
pub fn event_from_update(update: &Update) -> Option<InboundEvent> {
    let update_id = i64::from(update.id.0);
    match &update.kind {
        UpdateKind::Message(message) => Some(from_message(update_id, message)),
        UpdateKind::CallbackQuery(query) => Some(from_callback(update_id, query)),
        UpdateKind::ChatMember(updated) => from_member_update(update_id, updated),
        // Edits, channel posts, unknown kinds and bodies teloxide could not
        // make sense of all land here.
        _ => None,
    }
}

fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_private() {
        ChatKind::Private
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else if chat.is_channel() {
        ChatKind::Channel
    } else {
        ChatKind::Group
    }
}

fn media(message: &Message) -> MediaKind {
    if message.voice().is_some() {
        MediaKind::Voice
    } else if message.audio().is_some() {
        MediaKind::Audio
    } else if message.photo().is_some() {
        MediaKind::Photo
    } else if message.video().is_some()
        || message.video_note().is_some()
        || message.document().is_some()
        || message.sticker().is_some()
        || message.animation().is_some()
    {
        MediaKind::Other
    } else {
        MediaKind::None
    }
}

fn from_message(update_id: i64, message: &Message) -> InboundEvent {
    let joined: Vec<UserRef> = message
        .new_chat_members()
        .map(|users| users.iter().map(UserRef::from).collect())
        .unwrap_or_default();
    let left = message.left_chat_member().map(UserRef::from);

    let kind = if !joined.is_empty() || left.is_some() {
        EventKind::MembershipChange(MembershipChange {
            message_id: Some(message.id.0),
            joined,
            left,
        })
    } else {
        EventKind::Message(MessageEvent {
            message_id: message.id.0,
            text: message.text().map(str::to_string),
            reply_to: message.reply_to_message().map(|reply| ReplyTarget {
                message_id: reply.id.0,
                from: reply.from.as_ref().map(UserRef::from),
            }),
            media: media(message),
            via_bot: message.via_bot.is_some(),
        })
    };

    InboundEvent {
        update_id,
        chat_id: message.chat.id.0,
        chat_kind: chat_kind(&message.chat),
        sender: message.from.as_ref().map(UserRef::from),
        kind,
    }
}

fn from_callback(update_id: i64, query: &CallbackQuery) -> InboundEvent {
    let (chat_id, kind, message_id) = match &query.message {
        Some(message) => (
            message.chat().id.0,
            chat_kind(message.chat()),
            Some(message.id().0),
        ),
        None => (
            i64::try_from(query.from.id.0).unwrap_or_default(),
            ChatKind::Private,
            None,
        ),
    };

    InboundEvent {
        update_id,
        chat_id,
        chat_kind: kind,
        sender: Some(UserRef::from(&query.from)),
        kind: EventKind::CallbackQuery(CallbackEvent {
            query_id: query.id.clone(),
            message_id,
            data: query.data.clone(),
        }),
    }
}

fn from_member_update(update_id: i64, updated: &ChatMemberUpdated) -> Option<InboundEvent> {
    let user = UserRef::from(&updated.new_chat_member.user);
    let was_present = updated.old_chat_member.kind.is_present();
    let is_now_present = updated.new_chat_member.kind.is_present();

    let change = match (was_present, is_now_present) {
        (false, true) => MembershipChange {
            message_id: None,
            joined: vec![user],
            left: None,
        },
        (true, false) => MembershipChange {
            message_id: None,
            joined: Vec::new(),
            left: Some(user),
        },
        // Promotions, restrictions and the like are not membership changes.
        _ => return None,
    };

    Some(InboundEvent {
        update_id,
        chat_id: updated.chat.id.0,
        chat_kind: chat_kind(&updated.chat),
        sender: Some(UserRef::from(&updated.from)),
        kind: EventKind::MembershipChange(change),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(id: u64, name: &str) -> serde_json::Value {
        json!({ "id": id, "is_bot": false, "first_name": name })
    }

    fn group() -> serde_json::Value {
        json!({ "id": -100, "type": "supergroup", "title": "Tertulia" })
    }

    fn update(raw: serde_json::Value) -> Update {
        serde_json::from_str(&raw.to_string()).unwrap()
    }

    #[test]
    fn test_decode_reply_message() {
        let raw = json!({
            "update_id": 77,
            "message": {
                "message_id": 5,
                "date": 1_700_000_000,
                "chat": group(),
                "from": user(1, "Ana"),
                "text": "+1 thanks",
                "reply_to_message": {
                    "message_id": 4,
                    "date": 1_700_000_000,
                    "chat": group(),
                    "from": user(2, "Ben"),
                    "text": "here you go"
                }
            }
        });

        let event = decode_update(raw.to_string().as_bytes()).unwrap().unwrap();
        assert_eq!(event.update_id, 77);
        assert_eq!(event.chat_id, -100);
        assert_eq!(event.chat_kind, ChatKind::Supergroup);
        assert_eq!(event.sender.as_ref().map(|u| u.id), Some(1));
        assert_eq!(event.text(), Some("+1 thanks"));

        let message = event.message().unwrap();
        let reply = message.reply_to.as_ref().unwrap();
        assert_eq!(reply.message_id, 4);
        assert_eq!(reply.from.as_ref().map(|u| u.id), Some(2));
        assert_eq!(message.media, MediaKind::None);
    }

    #[test]
    fn test_polled_update_keeps_its_body() {
        // What getUpdates hands back is already a typed Update.
        let polled = update(json!({
            "update_id": 90,
            "message": {
                "message_id": 6,
                "date": 1_700_000_000,
                "chat": group(),
                "from": user(1, "Ana"),
                "text": "+1",
                "reply_to_message": {
                    "message_id": 3,
                    "date": 1_700_000_000,
                    "chat": group(),
                    "from": user(2, "Ben"),
                    "text": "hola"
                }
            }
        }));

        let event = event_from_update(&polled).unwrap();
        assert_eq!(event.update_id, 90);
        assert_eq!(event.text(), Some("+1"));
        let reply = event.message().unwrap().reply_to.as_ref().unwrap();
        assert_eq!(reply.from.as_ref().map(|u| u.id), Some(2));
    }

    #[test]
    fn test_decode_join_service_message() {
        let joined = update(json!({
            "update_id": 78,
            "message": {
                "message_id": 9,
                "date": 1_700_000_000,
                "chat": group(),
                "from": user(3, "Cleo"),
                "new_chat_members": [user(3, "Cleo")]
            }
        }));

        let event = event_from_update(&joined).unwrap();
        let change = event.membership().unwrap();
        assert_eq!(change.message_id, Some(9));
        assert_eq!(change.joined.len(), 1);
        assert_eq!(change.joined[0].id, 3);
        assert!(change.left.is_none());
    }

    #[test]
    fn test_decode_chat_member_transitions() {
        let leave = update(json!({
            "update_id": 79,
            "chat_member": {
                "chat": group(),
                "from": user(3, "Cleo"),
                "date": 1_700_000_000,
                "old_chat_member": { "user": user(3, "Cleo"), "status": "member" },
                "new_chat_member": { "user": user(3, "Cleo"), "status": "left" }
            }
        }));
        let event = event_from_update(&leave).unwrap();
        assert_eq!(event.membership().unwrap().left.as_ref().map(|u| u.id), Some(3));

        let join = update(json!({
            "update_id": 80,
            "chat_member": {
                "chat": group(),
                "from": user(3, "Cleo"),
                "date": 1_700_000_000,
                "old_chat_member": { "user": user(3, "Cleo"), "status": "left" },
                "new_chat_member": { "user": user(3, "Cleo"), "status": "member" }
            }
        }));
        let event = event_from_update(&join).unwrap();
        assert_eq!(event.membership().unwrap().joined[0].id, 3);

        let banned = update(json!({
            "update_id": 81,
            "chat_member": {
                "chat": group(),
                "from": user(1, "Ana"),
                "date": 1_700_000_000,
                "old_chat_member": { "user": user(3, "Cleo"), "status": "left" },
                "new_chat_member": { "user": user(3, "Cleo"), "status": "kicked", "until_date": 0 }
            }
        }));
        assert!(event_from_update(&banned).is_none());
    }

    #[test]
    fn test_decode_callback_query() {
        let raw = json!({
            "update_id": 82,
            "callback_query": {
                "id": "cb-1",
                "from": user(3, "Cleo"),
                "chat_instance": "x",
                "data": "chat_member_welcome_agree 3",
                "message": {
                    "message_id": 12,
                    "date": 1_700_000_000,
                    "chat": group(),
                    "text": "Welcome"
                }
            }
        });

        let event = decode_update(raw.to_string().as_bytes()).unwrap().unwrap();
        assert_eq!(event.chat_id, -100);
        let query = event.callback().unwrap();
        assert_eq!(query.query_id, "cb-1");
        assert_eq!(query.message_id, Some(12));
        assert_eq!(query.data.as_deref(), Some("chat_member_welcome_agree 3"));
    }

    #[test]
    fn test_decode_voice_media() {
        let voice = update(json!({
            "update_id": 83,
            "message": {
                "message_id": 13,
                "date": 1_700_000_000,
                "chat": group(),
                "from": user(1, "Ana"),
                "voice": { "file_id": "abc", "file_unique_id": "abc-u", "duration": 3 }
            }
        }));
        let event = event_from_update(&voice).unwrap();
        assert_eq!(event.message().unwrap().media, MediaKind::Voice);
    }

    #[test]
    fn test_unsupported_and_malformed() {
        let edited = json!({
            "update_id": 84,
            "edited_message": {
                "message_id": 1,
                "date": 1_700_000_000,
                "edit_date": 1_700_000_100,
                "chat": group(),
                "from": user(1, "Ana"),
                "text": "typo"
            }
        });
        assert!(decode_update(edited.to_string().as_bytes()).unwrap().is_none());

        assert!(decode_update(b"not json").is_err());
        assert!(decode_update(br#"{"message": {}}"#).is_err());
    }
}
