//! Audio-only mode.
//!
//! While enabled, text and other non-audio messages in the group are deleted
//! and the group is reminded to send voice messages.

use std::sync::Arc;

use tracing::{info, warn};

use crate::bot::AppState;
use crate::events::{InboundEvent, MediaKind};

const MSG_REMINDER: &str = "Audio-only mode is on. Please send a voice message.";

/// Handle /audio_only on|off
pub async fn audio_only(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    let arg = event
        .command()
        .and_then(|cmd| cmd.arg_list().first().map(|a| a.to_lowercase()));

    let text = match arg.as_deref() {
        Some("on") if state.audio_only() => "Audio-only mode is already activated.",
        Some("on") => {
            state.set_audio_only(true);
            info!("Audio-only mode enabled for {}", state.settings.group_id);
            "Audio-only mode has been activated."
        }
        Some("off") if !state.audio_only() => "Audio-only mode is not activated.",
        Some("off") => {
            state.set_audio_only(false);
            info!("Audio-only mode disabled for {}", state.settings.group_id);
            "Audio-only mode has been deactivated."
        }
        _ => "Usage: /audio_only on|off",
    };

    state.reply(&event, text).await?;
    Ok(())
}

/// Delete non-audio messages while audio-only mode is on.
pub async fn enforce(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    if !state.audio_only() {
        return Ok(());
    }
    let Some(message) = event.message() else {
        return Ok(());
    };

    let allowed = matches!(
        message.media,
        MediaKind::Voice | MediaKind::Audio | MediaKind::Photo
    ) || message.via_bot
        || event.command().is_some();
    if allowed {
        return Ok(());
    }

    if let Err(e) = state.api.delete_message(event.chat_id, message.message_id).await {
        warn!("Failed to delete message {} in audio-only mode: {}", message.message_id, e);
    }
    state.say(&event, MSG_REMINDER).await?;
    Ok(())
}
