//! Group roster maintenance.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::bot::{AggregateKey, AppState, BotSettings};
use crate::events::InboundEvent;
use crate::utils::html_escape;

/// A departure serializes with transfers to the departing member.
pub fn leaving_balance(settings: &BotSettings, event: &InboundEvent) -> Option<AggregateKey> {
    let user = event.membership()?.left.as_ref()?;
    Some(AggregateKey::Balance {
        group_id: settings.group_id,
        user_id: user.id,
    })
}

/// Keep the roster in step with joins and departures.
pub async fn sync_roster(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    let Some(change) = event.membership() else {
        return Ok(());
    };
    let group_id = state.settings.group_id;

    for user in &change.joined {
        if state.store.ensure_member(group_id, user.id).await? {
            info!("User {} joined {}", user.id, group_id);
        }
        state.access.invalidate(group_id, user.id);
    }

    if let Some(user) = &change.left {
        if state.store.remove_member(group_id, user.id).await? {
            info!("User {} left {}", user.id, group_id);
        }
        state.access.invalidate(group_id, user.id);
    }

    Ok(())
}

/// Delete "X joined" / "X left" service messages.
pub async fn cleanup_service_message(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    if let Some(message_id) = event.membership().and_then(|change| change.message_id) {
        if let Err(e) = state.api.delete_message(event.chat_id, message_id).await {
            debug!("Could not delete service message {}: {}", message_id, e);
        }
    }
    Ok(())
}

/// Handle /update_group_members - record the admins, then list the roster.
pub async fn update_group_members(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    let group_id = state.settings.group_id;

    let admins = state.api.get_chat_administrators(group_id).await?;
    for admin in admins.iter().filter(|a| !a.user.is_bot) {
        state.store.ensure_member(group_id, admin.user.id).await?;
    }

    let mut names = Vec::new();
    for member in state.store.list_members(group_id).await? {
        match state.api.get_chat_member(group_id, member.user_id).await {
            Ok(info) if info.status.is_present() => {
                names.push(format!("<b>{}</b>", html_escape(&info.user.display_name())))
            }
            Ok(_) => debug!("User {} is no longer in {}", member.user_id, group_id),
            Err(e) => warn!("User {} not resolvable in {}: {}", member.user_id, group_id, e),
        }
    }

    state
        .reply(&event, format!("<b>Members</b>\n{}", names.join("\n")))
        .await?;
    Ok(())
}
