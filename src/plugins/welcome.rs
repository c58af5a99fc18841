//! Welcome flow for new members.
//!
//! Newcomers are muted and shown the rules with an "I agree." button. Only
//! the newcomer's own click lifts the restriction.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::api::{CallbackButton, MemberPermissions, OutgoingMessage, UserRef};
use crate::bot::AppState;
use crate::events::InboundEvent;
use crate::utils::mention_html;

/// Callback data prefix of the agree button.
pub const AGREE_CALLBACK: &str = "chat_member_welcome_agree";

const MSG_AGREE: &str = "I agree.";

fn welcome_text(user: &UserRef) -> String {
    format!(
        "Welcome to the group, {}.\n\n\
         Please read the following rules and click the \"I agree\" button to participate.\n\n\
         <b>Rules (tentative)</b>\n\
         - Communicate in only English and Spanish.\n\
         - Don't harass other group members.\n\
         - Don't send private messages to other group members without their permission.\n\
         - Be a good example. There are people here learning your language. Help them out with corrections.",
        mention_html(user)
    )
}

fn agreed_text(user: &UserRef) -> String {
    format!(
        "Welcome to the group, {}.\n\n\
         We require new members to introduce themselves with a voice message within one day \
         of their joining. Failure to do so will result in your removal from the group.\n\n\
         We look forward to hearing from you.",
        mention_html(user)
    )
}

/// Mute each human newcomer and post the rules.
pub async fn welcome_new_members(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    let Some(change) = event.membership() else {
        return Ok(());
    };

    for user in change.joined.iter().filter(|u| !u.is_bot) {
        if let Err(e) = state
            .api
            .restrict_chat_member(event.chat_id, user.id, MemberPermissions::Muted, None)
            .await
        {
            warn!("Failed to mute newcomer {}: {}", user.id, e);
        }

        let button = CallbackButton::new(MSG_AGREE, format!("{} {}", AGREE_CALLBACK, user.id));
        state
            .api
            .send_message(OutgoingMessage::html(event.chat_id, welcome_text(user)).keyboard(vec![vec![button]]))
            .await?;
        info!("Welcomed user {} in {}", user.id, event.chat_id);
    }
    Ok(())
}

/// Handle the agree button.
pub async fn welcome_agree(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    let Some(query) = event.callback() else {
        return Ok(());
    };

    if let Err(e) = state.api.answer_callback_query(&query.query_id, None).await {
        warn!("Failed to answer callback {}: {}", query.query_id, e);
    }

    let Some(clicker) = event.sender.as_ref() else {
        return Ok(());
    };
    let welcomed = query
        .data
        .as_deref()
        .and_then(|data| data.strip_prefix(AGREE_CALLBACK))
        .and_then(|rest| rest.trim().parse::<u64>().ok());

    let Some(welcomed) = welcomed else {
        debug!("Malformed welcome callback data: {:?}", query.data);
        return Ok(());
    };

    if clicker.id != welcomed {
        info!("User {} clicked the welcome button of user {}", clicker.id, welcomed);
        return Ok(());
    }

    // Lifted again by the group's defaults once this expires.
    let until = Utc::now() + chrono::Duration::minutes(2);
    state
        .api
        .restrict_chat_member(event.chat_id, clicker.id, MemberPermissions::Default, Some(until))
        .await?;

    if let Some(message_id) = query.message_id {
        if let Err(e) = state.api.delete_message(event.chat_id, message_id).await {
            warn!("Failed to delete welcome message {}: {}", message_id, e);
        }
    }

    state.access.invalidate(state.settings.group_id, clicker.id);
    state.say(&event, agreed_text(clicker)).await?;
    info!("User {} agreed to the rules of {}", clicker.id, event.chat_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::Restriction;
    use crate::testing::{self, Harness, GROUP, MEMBER};

    #[tokio::test]
    async fn test_newcomer_is_muted_and_welcomed() {
        let h = Harness::new().await;
        let newcomer = testing::user(70);
        h.dispatch(testing::joined(1, vec![newcomer, testing::bot_user()])).await;

        assert_eq!(
            h.api.restrictions(),
            vec![Restriction {
                chat_id: GROUP,
                user_id: 70,
                permissions: MemberPermissions::Muted,
            }]
        );

        let sent = h.api.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.starts_with("Welcome to the group, <a href=\"tg://user?id=70\">User70</a>."));
        assert_eq!(sent[0].keyboard[0][0].text, "I agree.");
        assert_eq!(sent[0].keyboard[0][0].data, "chat_member_welcome_agree 70");
    }

    #[tokio::test]
    async fn test_agree_by_newcomer_unmutes() {
        let h = Harness::new().await;
        h.dispatch(testing::callback(1, testing::user(70), 900, "chat_member_welcome_agree 70"))
            .await;

        assert_eq!(h.api.answered(), vec!["cb-1"]);
        assert_eq!(h.api.restrictions()[0].permissions, MemberPermissions::Default);
        assert_eq!(h.api.deleted(), vec![(GROUP, 900)]);
        assert!(h
            .api
            .sent_texts()
            .last()
            .unwrap()
            .contains("introduce themselves with a voice message"));
    }

    #[tokio::test]
    async fn test_agree_by_someone_else_is_ignored() {
        let h = Harness::new().await;
        h.dispatch(testing::callback(1, testing::user(MEMBER), 900, "chat_member_welcome_agree 70"))
            .await;

        assert_eq!(h.api.answered(), vec!["cb-1"]);
        assert!(h.api.restrictions().is_empty());
        assert!(h.api.deleted().is_empty());
        assert!(h.api.sent().is_empty());
    }
}
