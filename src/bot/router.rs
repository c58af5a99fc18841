//! Handler registrations and event routing.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use regex::Regex;
use tracing::debug;

use super::context::{AppState, BotSettings};
use super::locks::AggregateKey;
use crate::events::{EventTag, InboundEvent};
use crate::permissions::AccessTier;

/// Async handler body.
pub type Endpoint =
    Arc<dyn Fn(AppState, Arc<InboundEvent>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Picks the record a handler mutates, if any.
pub type AggregateFn = fn(&BotSettings, &InboundEvent) -> Option<AggregateKey>;

/// Wrap an async fn as an [`Endpoint`].
pub fn endpoint<F, Fut>(handler: F) -> Endpoint
where
    F: Fn(AppState, Arc<InboundEvent>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |state, event| Box::pin(handler(state, event)))
}

/// When a registration applies to an event.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// `/name`, or `/name@bot` when addressed to this bot.
    Command(&'static str),
    /// Regex on the message text.
    Pattern { regex: Regex, reply_only: bool },
    /// Any event of this kind.
    Kind(EventTag),
    /// Callback query whose data starts with the prefix.
    Callback { prefix: &'static str },
}

impl Predicate {
    pub fn pattern(regex: &Regex) -> Self {
        Self::Pattern {
            regex: regex.clone(),
            reply_only: false,
        }
    }

    /// Only messages that reply to another message.
    pub fn reply_pattern(regex: &Regex) -> Self {
        Self::Pattern {
            regex: regex.clone(),
            reply_only: true,
        }
    }

    pub fn matches(&self, event: &InboundEvent, bot_username: &str) -> bool {
        match self {
            Self::Command(name) => event
                .command()
                .map(|cmd| cmd.name.eq_ignore_ascii_case(name) && cmd.is_addressed_to(bot_username))
                .unwrap_or(false),
            Self::Pattern { regex, reply_only } => match event.message() {
                Some(message) => {
                    let text_matches = message
                        .text
                        .as_deref()
                        .map(|text| regex.is_match(text))
                        .unwrap_or(false);
                    text_matches && (!reply_only || message.reply_to.is_some())
                }
                None => false,
            },
            Self::Kind(tag) => event.kind.tag() == *tag,
            Self::Callback { prefix } => event
                .callback()
                .and_then(|query| query.data.as_deref())
                .map(|data| data.starts_with(prefix))
                .unwrap_or(false),
        }
    }
}

/// One handler and the policy around it. Immutable once the engine starts.
#[derive(Clone)]
pub struct HandlerRegistration {
    pub name: &'static str,
    /// Lower groups run first.
    pub priority_group: u8,
    pub predicate: Predicate,
    pub required_tier: AccessTier,
    /// Tell a non-member why nothing happened.
    pub notify_denied: bool,
    /// Only events from the bot's own group.
    pub home_chat_only: bool,
    pub aggregate: Option<AggregateFn>,
    endpoint: Endpoint,
}

impl HandlerRegistration {
    /// Member-gated registration in group 0.
    pub fn new(name: &'static str, predicate: Predicate, endpoint: Endpoint) -> Self {
        Self {
            name,
            priority_group: 0,
            predicate,
            required_tier: AccessTier::Member,
            notify_denied: true,
            home_chat_only: false,
            aggregate: None,
            endpoint,
        }
    }

    #[must_use]
    pub fn group(mut self, priority_group: u8) -> Self {
        self.priority_group = priority_group;
        self
    }

    #[must_use]
    pub fn tier(mut self, tier: AccessTier) -> Self {
        self.required_tier = tier;
        self
    }

    /// Skip silently when the sender lacks the tier.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.notify_denied = false;
        self
    }

    #[must_use]
    pub fn home_only(mut self) -> Self {
        self.home_chat_only = true;
        self
    }

    #[must_use]
    pub fn serialize_on(mut self, aggregate: AggregateFn) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    pub fn call(&self, state: AppState, event: Arc<InboundEvent>) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.endpoint)(state, event)
    }
}

impl std::fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("name", &self.name)
            .field("priority_group", &self.priority_group)
            .field("predicate", &self.predicate)
            .field("required_tier", &self.required_tier)
            .finish_non_exhaustive()
    }
}

/// Maps events to the registrations that handle them.
pub struct Router {
    registrations: Vec<HandlerRegistration>,
    bot_username: String,
    home_group: i64,
}

impl Router {
    pub fn new(mut registrations: Vec<HandlerRegistration>, settings: &BotSettings) -> Self {
        // Stable: registration order is kept within a group.
        registrations.sort_by_key(|r| r.priority_group);
        Self {
            registrations,
            bot_username: settings.username.clone(),
            home_group: settings.group_id,
        }
    }

    /// Matching registrations, lowest group first.
    pub fn route(&self, event: &InboundEvent) -> Vec<&HandlerRegistration> {
        let matches: Vec<_> = self
            .registrations
            .iter()
            .filter(|r| !r.home_chat_only || event.chat_id == self.home_group)
            .filter(|r| r.predicate.matches(event, &self.bot_username))
            .collect();

        if matches.is_empty() {
            debug!("No handler for update {}", event.update_id);
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, settings};

    fn noop() -> Endpoint {
        endpoint(|_, _| async { Ok::<(), anyhow::Error>(()) })
    }

    fn names(router: &Router, event: &InboundEvent) -> Vec<&'static str> {
        router.route(event).into_iter().map(|r| r.name).collect()
    }

    #[test]
    fn test_route_orders_by_group_then_registration() {
        let plus = Regex::new(r"^\+").unwrap();
        let router = Router::new(
            vec![
                HandlerRegistration::new("late", Predicate::Kind(EventTag::Message), noop()).group(3),
                HandlerRegistration::new("points", Predicate::reply_pattern(&plus), noop()).group(2),
                HandlerRegistration::new("first", Predicate::Kind(EventTag::Message), noop()),
                HandlerRegistration::new("second", Predicate::Kind(EventTag::Message), noop()),
            ],
            &settings(),
        );

        let event = testing::reply_message(1, testing::user(1), testing::user(2), "+1");
        assert_eq!(names(&router, &event), vec!["first", "second", "points", "late"]);

        // Not a reply: the points pattern does not apply.
        let event = testing::message(2, testing::user(1), "+1");
        assert_eq!(names(&router, &event), vec!["first", "second", "late"]);
    }

    #[test]
    fn test_command_mentions() {
        let router = Router::new(
            vec![HandlerRegistration::new("start", Predicate::Command("start"), noop())],
            &settings(),
        );

        let mine = testing::message(1, testing::user(1), "/start@tertulia_bot");
        let other = testing::message(2, testing::user(1), "/start@other_bot");
        let bare = testing::message(3, testing::user(1), "/start now");
        let longer = testing::message(4, testing::user(1), "/startle");

        assert_eq!(names(&router, &mine), vec!["start"]);
        assert!(router.route(&other).is_empty());
        assert_eq!(names(&router, &bare), vec!["start"]);
        assert!(router.route(&longer).is_empty());
    }

    #[test]
    fn test_home_only_and_callback_prefix() {
        let router = Router::new(
            vec![
                HandlerRegistration::new("home", Predicate::Kind(EventTag::Message), noop()).home_only(),
                HandlerRegistration::new(
                    "agree",
                    Predicate::Callback {
                        prefix: "chat_member_welcome_agree",
                    },
                    noop(),
                ),
            ],
            &settings(),
        );

        let mut elsewhere = testing::message(1, testing::user(1), "hi");
        elsewhere.chat_id = 12345;
        assert!(router.route(&elsewhere).is_empty());

        let agree = testing::callback(2, testing::user(1), 50, "chat_member_welcome_agree 1");
        assert_eq!(names(&router, &agree), vec!["agree"]);
        let other = testing::callback(3, testing::user(1), 50, "something_else");
        assert!(router.route(&other).is_empty());
    }
}
