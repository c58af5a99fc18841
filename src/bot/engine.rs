//! Dispatch engine.
//!
//! Takes one raw update through dedupe, access resolution and routing, then
//! runs the matching handlers in priority order. Handler failures stay inside
//! the engine: they are logged and the remaining handlers still run.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use teloxide::types::Update;
use tracing::{debug, error, warn};

use super::context::AppState;
use super::dedupe::Deduplicator;
use super::locks::AggregateLocks;
use super::router::{HandlerRegistration, Router};
use crate::events::{decode_update, event_from_update, DecodeError, InboundEvent};
use crate::permissions::AccessTier;
use crate::utils::html_escape;

/// What happened to one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Well-formed, but of a kind the bot does not handle.
    Ignored,
    /// Seen before; nothing ran.
    Duplicate,
    /// No registration matched.
    Dropped,
    Completed { handled: usize, denied: usize },
    /// At least one handler returned an error or panicked.
    HandlerFailed { failed: Vec<&'static str> },
    TimedOut,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Malformed(#[from] DecodeError),
}

pub struct Engine {
    state: AppState,
    router: Router,
    dedupe: Deduplicator,
    locks: AggregateLocks,
    event_timeout: Duration,
}

impl Engine {
    pub fn new(
        state: AppState,
        registrations: Vec<HandlerRegistration>,
        dedupe: Deduplicator,
        event_timeout: Duration,
    ) -> Self {
        let router = Router::new(registrations, &state.settings);
        Self {
            state,
            router,
            dedupe,
            locks: AggregateLocks::new(),
            event_timeout,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Process a raw webhook body.
    pub async fn ingest(&self, raw: &[u8]) -> Result<Outcome, IngestError> {
        let event = decode_update(raw)?;
        Ok(self.accept(event).await)
    }

    /// Process an update fetched by the poll loop.
    pub async fn ingest_update(&self, update: &Update) -> Outcome {
        self.accept(event_from_update(update)).await
    }

    async fn accept(&self, event: Option<InboundEvent>) -> Outcome {
        match event {
            Some(event) => self.dispatch(event).await,
            None => {
                debug!("Ignoring unsupported update");
                Outcome::Ignored
            }
        }
    }

    /// Dedupe, then run the event under the per-event time cap.
    pub async fn dispatch(&self, event: InboundEvent) -> Outcome {
        let update_id = event.update_id;

        if !self.dedupe.first_delivery(update_id) {
            debug!("Duplicate update {}", update_id);
            return Outcome::Duplicate;
        }

        match tokio::time::timeout(self.event_timeout, self.execute(Arc::new(event))).await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(
                    "Update {} timed out after {:?}",
                    update_id, self.event_timeout
                );
                Outcome::TimedOut
            }
        }
    }

    async fn execute(&self, event: Arc<InboundEvent>) -> Outcome {
        let matches = self.router.route(&event);
        if matches.is_empty() {
            return Outcome::Dropped;
        }

        let tier = self.sender_tier(&event, &matches).await;

        let mut handled = 0;
        let mut denied = 0;
        let mut failed = Vec::new();
        let mut notified = false;

        for registration in matches {
            if tier < registration.required_tier {
                denied += 1;
                debug!(
                    "Skipping {} for update {}: needs {}, sender is {}",
                    registration.name, event.update_id, registration.required_tier, tier
                );
                if tier == AccessTier::None && registration.notify_denied && !notified {
                    notified = true;
                    self.notify_non_member(&event).await;
                }
                continue;
            }

            let _guard = match registration
                .aggregate
                .and_then(|key_of| key_of(&self.state.settings, &event))
            {
                Some(key) => Some(self.locks.lock(key).await),
                None => None,
            };

            let run = registration.call(self.state.clone(), event.clone());
            match AssertUnwindSafe(run).catch_unwind().await {
                Ok(Ok(())) => handled += 1,
                Ok(Err(e)) => {
                    error!(
                        "Handler {} failed on update {}: {:#}",
                        registration.name, event.update_id, e
                    );
                    failed.push(registration.name);
                }
                Err(panic) => {
                    error!(
                        "Handler {} panicked on update {}: {}",
                        registration.name,
                        event.update_id,
                        panic_message(panic.as_ref())
                    );
                    failed.push(registration.name);
                }
            }
        }

        if failed.is_empty() {
            Outcome::Completed { handled, denied }
        } else {
            Outcome::HandlerFailed { failed }
        }
    }

    /// Resolve the sender against the bot's group, skipping the lookup when
    /// every match is open to everyone.
    async fn sender_tier(&self, event: &InboundEvent, matches: &[&HandlerRegistration]) -> AccessTier {
        let gated = matches
            .iter()
            .any(|r| r.required_tier > AccessTier::None);

        match &event.sender {
            Some(sender) if gated => {
                self.state
                    .access
                    .resolve(self.state.settings.group_id, sender.id)
                    .await
            }
            _ => AccessTier::None,
        }
    }

    async fn notify_non_member(&self, event: &InboundEvent) {
        let settings = &self.state.settings;
        let mut text = format!(
            "This bot is exclusively for members of the group <b>{}</b>.\n\nCome join us!",
            html_escape(&settings.group_title)
        );
        if let Some(link) = &settings.invite_link {
            text.push('\n');
            text.push_str(&html_escape(link));
        }

        if let Err(e) = self.state.reply(event, text).await {
            warn!("Failed to send non-member notice for update {}: {}", event.update_id, e);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
