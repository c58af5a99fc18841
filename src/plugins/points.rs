//! Point transfers between group members.
//!
//! Replying to a message with text starting with `+` gives its author the
//! sender's increment; `-` takes it away (never below zero).

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::bot::{AggregateKey, AppState, BotSettings};
use crate::events::InboundEvent;
use crate::utils::{html_escape, unit_for};

pub static ADD_POINTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+").expect("add points regex"));
pub static REMOVE_POINTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-").expect("remove points regex"));

/// Number of members listed by `/top_points`.
const TOP_POINTS_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Give,
    Take,
}

/// Transfers serialize on the receiver's balance.
pub fn receiver_balance(settings: &BotSettings, event: &InboundEvent) -> Option<AggregateKey> {
    let receiver = event.message()?.reply_to.as_ref()?.from.as_ref()?;
    Some(AggregateKey::Balance {
        group_id: settings.group_id,
        user_id: receiver.id,
    })
}

pub async fn add_points(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    transfer(&state, &event, Direction::Give).await
}

pub async fn remove_points(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    transfer(&state, &event, Direction::Take).await
}

async fn transfer(state: &AppState, event: &InboundEvent, direction: Direction) -> anyhow::Result<()> {
    let Some(sender) = event.sender.as_ref() else {
        return Ok(());
    };
    let Some(receiver) = event
        .message()
        .and_then(|m| m.reply_to.as_ref())
        .and_then(|reply| reply.from.as_ref())
    else {
        return Ok(());
    };

    let settings = &state.settings;
    let points_name = html_escape(&settings.points_name);

    if receiver.is_bot {
        let text = match direction {
            Direction::Give => format!("You can't give {} to a bot.", points_name),
            Direction::Take => format!("You can't take {} from a bot.", points_name),
        };
        state.say(event, text).await?;
        return Ok(());
    }

    if receiver.id == sender.id {
        let text = match direction {
            Direction::Give => format!("You can't give {} to yourself.", points_name),
            Direction::Take => format!("You can't take {} from yourself.", points_name),
        };
        state.say(event, text).await?;
        return Ok(());
    }

    let group_id = settings.group_id;
    let giver = state.store.balance(group_id, sender.id).await?;
    let mut balance = state.store.balance(group_id, receiver.id).await?;

    match direction {
        Direction::Give => balance.credit(giver.increment),
        Direction::Take => balance.debit(giver.increment),
    }
    state.store.save_balance(&balance).await?;

    info!(
        "User {} {} {} point(s) {} user {} in {}, now {}",
        sender.id,
        if direction == Direction::Give { "gave" } else { "took" },
        giver.increment,
        if direction == Direction::Give { "to" } else { "from" },
        receiver.id,
        group_id,
        balance.points
    );

    let unit = unit_for(giver.increment, &settings.point_name, &settings.points_name);
    let article = if giver.increment > 1 { "some" } else { "a" };
    let (verb, preposition) = match direction {
        Direction::Give => ("given", "to"),
        Direction::Take => ("taken", "from"),
    };

    let text = format!(
        "<b>{} ({})</b> has {} {} {} {} <b>{} ({})</b>.",
        html_escape(&sender.display_name()),
        giver.points,
        verb,
        article,
        html_escape(unit),
        preposition,
        html_escape(&receiver.display_name()),
        balance.points
    );
    state.say(event, text).await?;
    Ok(())
}

/// Handle /top_points - ranking of the group's balances.
pub async fn top_points(state: AppState, event: Arc<InboundEvent>) -> anyhow::Result<()> {
    let settings = &state.settings;
    let balances = state
        .store
        .top_balances(settings.group_id, TOP_POINTS_LIMIT)
        .await?;

    let mut lines = Vec::with_capacity(balances.len());
    for balance in balances {
        match state
            .api
            .get_chat_member(settings.group_id, balance.user_id)
            .await
        {
            Ok(member) => lines.push(format!(
                "<b>{}: {}</b>",
                balance.points,
                html_escape(&member.user.display_name())
            )),
            Err(e) => warn!(
                "Skipping user {} in top points: {}",
                balance.user_id, e
            ),
        }
    }

    if lines.is_empty() {
        state
            .reply(
                &event,
                format!("No {} have been given yet.", html_escape(&settings.points_name)),
            )
            .await?;
        return Ok(());
    }

    let text = format!(
        "<b>Top {} rankings</b>\n{}",
        html_escape(&settings.point_name),
        lines.join("\n")
    );
    state.say(&event, text).await?;
    Ok(())
}
