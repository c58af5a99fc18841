//! Notes command handlers.
//!
//! Owners save notes under a tag; members fetch them with `#tag`. A note is
//! either inline text or a message archived in the repo chat.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::api::OutgoingMessage;
use crate::bot::{AggregateKey, AppState, BotSettings};
use crate::database::{normalize_tag, GroupNote, NoteBody};
use crate::events::InboundEvent;
use crate::utils::html_escape;

pub static GET_NOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[A-Za-z0-9_-]+$").expect("note tag regex"));

const MSG_NEEDS_TAG: &str = "A group note must have a tag.";
const MSG_BAD_TAG: &str = "Note tags may only contain letters, digits, <code>_</code> and <code>-</code>.";
const MSG_NEEDS_CONTENT: &str = "A group note needs content.";
const MSG_CONTACT_OWNER: &str =
    "This note's message is no longer available. Please contact the group owner.";

/// Note writes serialize on `(group, tag)`.
pub fn note_tag(settings: &BotSettings, event: &InboundEvent) -> Option<AggregateKey> {
    let (raw, _) = event.command()?.split_first_arg()?;
    Some(AggregateKey::Note {
        group_id: settings.group_id,
        tag: normalize_tag(raw)?,
    })
}

/// Handle /save_group_note <tag> [content], or reply to a message with /save_group_note <tag>.
pub async fn save_group_note(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    let (Some(command), Some(message)) = (event.command(), event.message()) else {
        return Ok(());
    };

    let Some((raw_tag, content)) = command.split_first_arg() else {
        state.reply(&event, MSG_NEEDS_TAG).await?;
        return Ok(());
    };
    let Some(tag) = normalize_tag(raw_tag) else {
        state.reply(&event, MSG_BAD_TAG).await?;
        return Ok(());
    };

    let settings = &state.settings;
    let body = if let Some(replied) = &message.reply_to {
        let Some(repo_chat_id) = settings.repo_chat_id else {
            state
                .reply(&event, "No archive chat is configured, so notes can only hold text.")
                .await?;
            return Ok(());
        };
        match state
            .api
            .copy_message(repo_chat_id, event.chat_id, replied.message_id)
            .await
        {
            Ok(archived_id) => NoteBody::MessageRef(archived_id),
            Err(e) => {
                warn!("Failed to archive note '{}': {}", tag, e);
                state
                    .reply(&event, "The message could not be archived. Nothing was saved.")
                    .await?;
                return Ok(());
            }
        }
    } else if content.is_empty() {
        state.reply(&event, MSG_NEEDS_CONTENT).await?;
        return Ok(());
    } else {
        NoteBody::Content(content.to_string())
    };

    let note = GroupNote {
        group_id: settings.group_id,
        tag,
        body,
    };
    state.store.save_note(&note).await?;
    info!("Saved group note '{}' in {}", note.tag, note.group_id);

    state
        .reply(
            &event,
            format!("Group note <b>{}</b> has been saved.", html_escape(&note.tag)),
        )
        .await?;
    Ok(())
}

/// Handle /remove_group_note <tag>.
pub async fn remove_group_note(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    let Some(command) = event.command() else {
        return Ok(());
    };
    let Some(tag) = command.split_first_arg().and_then(|(raw, _)| normalize_tag(raw)) else {
        state.reply(&event, MSG_NEEDS_TAG).await?;
        return Ok(());
    };

    let text = if state.store.remove_note(state.settings.group_id, &tag).await? {
        info!("Removed group note '{}'", tag);
        format!("Group note <b>{}</b> has been removed.", html_escape(&tag))
    } else {
        format!("Group note <b>{}</b> not found.", html_escape(&tag))
    };
    state.reply(&event, text).await?;
    Ok(())
}

/// Handle /group_notes - list all tags.
pub async fn group_notes(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    let tags = state.store.list_notes(state.settings.group_id).await?;

    let text = if tags.is_empty() {
        "There are no group notes yet.".to_string()
    } else {
        let lines: Vec<String> = tags
            .iter()
            .map(|tag| format!("<b>- {}</b>", html_escape(tag)))
            .collect();
        format!("<b>Group notes</b>\n{}", lines.join("\n"))
    };
    state.say(&event, text).await?;
    Ok(())
}

/// Handle `#tag` - send the note back.
pub async fn get_group_note(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    let Some(tag) = event.text().and_then(normalize_tag) else {
        return Ok(());
    };
    let settings = &state.settings;

    let Some(note) = state.store.get_note(settings.group_id, &tag).await? else {
        state
            .reply(&event, format!("Group note <b>{}</b> not found.", html_escape(&tag)))
            .await?;
        return Ok(());
    };

    match note.body {
        NoteBody::Content(content) => {
            let mut message = OutgoingMessage::plain(event.chat_id, content);
            if let Some(message_id) = event.message_id() {
                message = message.reply_to(message_id);
            }
            state.api.send_message(message).await?;
        }
        NoteBody::MessageRef(archived_id) => {
            let copied = match settings.repo_chat_id {
                Some(repo_chat_id) => match state
                    .api
                    .copy_message(event.chat_id, repo_chat_id, archived_id)
                    .await
                {
                    Ok(_) => true,
                    Err(e) => {
                        warn!("Archived note '{}' unavailable: {}", tag, e);
                        false
                    }
                },
                None => false,
            };
            if !copied {
                state.reply(&event, MSG_CONTACT_OWNER).await?;
            }
        }
    }
    Ok(())
}
