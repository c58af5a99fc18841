//! Webhook ingress.
//!
//! Telegram posts each update to `/webhook/<token>/`. The token in the path
//! selects the bot instance; anything unknown or unreadable gets a 404.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use tracing::{debug, info, warn};
use url::Url;

use super::registry::BotRegistry;

/// Public webhook URL Telegram should call for `token`.
pub fn webhook_url(base: &Url, token: &str) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&format!("webhook/{}/", token))
}

pub fn router(registry: Arc<BotRegistry>) -> Router {
    Router::new()
        .route("/webhook/:token/", post(receive))
        .with_state(registry)
}

/// Handle one webhook delivery.
pub async fn receive(
    State(registry): State<Arc<BotRegistry>>,
    Path(token): Path<String>,
    body: Bytes,
) -> StatusCode {
    let Some(instance) = registry.by_token(&token) else {
        warn!("Webhook call for an unknown bot token");
        return StatusCode::NOT_FOUND;
    };

    match instance.engine.ingest(&body).await {
        Ok(outcome) => {
            debug!("Bot {} webhook update: {:?}", instance.id, outcome);
            StatusCode::OK
        }
        Err(e) => {
            warn!("Bot {} rejected webhook payload: {}", instance.id, e);
            StatusCode::NOT_FOUND
        }
    }
}

/// Register webhooks for every bot and serve until Ctrl+C.
pub async fn serve(registry: Arc<BotRegistry>, base_url: &Url, port: u16) -> anyhow::Result<()> {
    for instance in registry.instances() {
        let url = webhook_url(base_url, &instance.token)?;
        instance.api.set_webhook(&url).await?;
        info!("Webhook registered for bot {}", instance.id);
    }

    let address = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("📡 Listening on: {}", address);

    axum::serve(listener, router(registry))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down webhook server");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Harness};

    #[test]
    fn test_webhook_url_joins_token() {
        let base = Url::parse("https://bots.example.com/tg").unwrap();
        assert_eq!(
            webhook_url(&base, "123:abc").unwrap().as_str(),
            "https://bots.example.com/tg/webhook/123:abc/"
        );
        let root = Url::parse("https://bots.example.com").unwrap();
        assert_eq!(
            webhook_url(&root, "t").unwrap().as_str(),
            "https://bots.example.com/webhook/t/"
        );
    }

    #[tokio::test]
    async fn test_receive_status_codes() {
        let harness = Harness::new().await;
        let registry = Arc::new(harness.registry());

        let update = testing::message_json(1, &testing::user(1), "hello");
        let ok = receive(
            State(registry.clone()),
            Path(testing::TOKEN.to_string()),
            Bytes::from(update.to_string()),
        )
        .await;
        assert_eq!(ok, StatusCode::OK);

        let unknown = receive(
            State(registry.clone()),
            Path("nope".to_string()),
            Bytes::from(update.to_string()),
        )
        .await;
        assert_eq!(unknown, StatusCode::NOT_FOUND);

        let malformed = receive(
            State(registry),
            Path(testing::TOKEN.to_string()),
            Bytes::from_static(b"{not json"),
        )
        .await;
        assert_eq!(malformed, StatusCode::NOT_FOUND);
    }
}
