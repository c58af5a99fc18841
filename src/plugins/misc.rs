//! Small utility commands.

use std::sync::Arc;

use crate::api::OutgoingMessage;
use crate::bot::AppState;
use crate::events::InboundEvent;
use crate::utils::{html_escape, mention_html};

/// Handle /start
pub async fn start(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    let Some(sender) = event.sender.as_ref() else {
        return Ok(());
    };
    let text = format!(
        "Hello, {}. {} has started.",
        mention_html(sender),
        html_escape(&state.settings.first_name)
    );
    state.reply(&event, text).await?;
    Ok(())
}

/// Handle /reverse - reply with the arguments reversed.
pub async fn reverse(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    let Some(args) = event.command().map(|cmd| cmd.args) else {
        return Ok(());
    };
    if args.is_empty() {
        return Ok(());
    }
    let reversed: String = args.chars().rev().collect();

    let mut message = OutgoingMessage::plain(event.chat_id, reversed);
    if let Some(message_id) = event.message_id() {
        message = message.reply_to(message_id);
    }
    state.api.send_message(message).await?;
    Ok(())
}

/// Handle /echo - post the arguments to the group as the bot.
pub async fn echo(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    let Some(args) = event.command().map(|cmd| cmd.args) else {
        return Ok(());
    };
    if args.is_empty() {
        return Ok(());
    }
    state
        .api
        .send_message(OutgoingMessage::plain(state.settings.group_id, args))
        .await?;
    Ok(())
}
