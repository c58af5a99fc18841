//! Configuration module for Tertulia.
//!
//! Loads configuration from environment variables. Settings shared by the
//! process are read once; each bot instance named in `BOT_IDS` reads its own
//! `BOT_<ID>_*` block.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

/// Bot running mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BotMode {
    #[default]
    Polling,
    Webhook,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(String),
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: String, value: String },
    #[error("WEBHOOK_URL must be set when BOT_MODE is webhook")]
    WebhookUrlRequired,
    #[error("no bot configured; set BOT_IDS")]
    NoBots,
}

/// One bot instance: a token bound to one group.
#[derive(Clone)]
pub struct BotConfig {
    pub id: String,
    pub token: String,
    /// The group this bot manages; access is always resolved against it.
    pub group_id: i64,
    /// Private chat where note content is archived.
    pub repo_chat_id: Option<i64>,
    pub sudo_ids: Vec<u64>,
    pub group_title: String,
    pub invite_link: Option<String>,
    /// Unit name used in point messages, singular and plural.
    pub point_name: String,
    pub points_name: String,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .field("group_id", &self.group_id)
            .field("repo_chat_id", &self.repo_chat_id)
            .field("sudo_ids", &self.sudo_ids)
            .field("group_title", &self.group_title)
            .finish_non_exhaustive()
    }
}

/// Dispatch engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub access_cache_ttl: Duration,
    pub lookup_timeout: Duration,
    pub event_timeout: Duration,
    pub dedupe_window: u64,
    pub dedupe_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            access_cache_ttl: Duration::from_secs(60),
            lookup_timeout: Duration::from_millis(5_000),
            event_timeout: Duration::from_secs(30),
            dedupe_window: 10_000,
            dedupe_ttl: Duration::from_secs(600),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_mode: BotMode,
    pub webhook_url: Option<Url>,
    pub webhook_port: u16,

    // MongoDB
    /// Absent means the in-memory store.
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,

    pub engine: EngineConfig,

    /// Bots keyed by lowercase id.
    pub bots: BTreeMap<String, BotConfig>,
}

impl Config {
    /// Load configuration from the process environment (and `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_mode = match get("BOT_MODE").map(|m| m.to_lowercase()).as_deref() {
            None | Some("polling") => BotMode::Polling,
            Some("webhook") => BotMode::Webhook,
            Some(other) => return Err(invalid("BOT_MODE", other)),
        };

        let webhook_url = get("WEBHOOK_URL")
            .map(|raw| Url::parse(&raw).map_err(|_| invalid("WEBHOOK_URL", &raw)))
            .transpose()?;

        // Validate webhook URL is set if mode is webhook
        if bot_mode == BotMode::Webhook && webhook_url.is_none() {
            return Err(ConfigError::WebhookUrlRequired);
        }

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            access_cache_ttl: Duration::from_secs(parse_or(
                &get,
                "ACCESS_CACHE_TTL_SECS",
                defaults.access_cache_ttl.as_secs(),
            )?),
            lookup_timeout: Duration::from_millis(parse_positive_or(
                &get,
                "LOOKUP_TIMEOUT_MS",
                5_000,
            )?),
            event_timeout: Duration::from_secs(parse_positive_or(
                &get,
                "EVENT_TIMEOUT_SECS",
                defaults.event_timeout.as_secs(),
            )?),
            dedupe_window: parse_positive_or(&get, "DEDUPE_WINDOW", defaults.dedupe_window)?,
            dedupe_ttl: Duration::from_secs(parse_positive_or(
                &get,
                "DEDUPE_TTL_SECS",
                defaults.dedupe_ttl.as_secs(),
            )?),
        };

        let mut bots = BTreeMap::new();
        for id in get("BOT_IDS").unwrap_or_default().split(',') {
            let id = id.trim().to_lowercase();
            if id.is_empty() {
                continue;
            }
            let bot = bot_from_lookup(&get, &id)?;
            bots.insert(id, bot);
        }

        if bots.is_empty() {
            return Err(ConfigError::NoBots);
        }

        Ok(Self {
            bot_mode,
            webhook_url,
            webhook_port: parse_or(&get, "WEBHOOK_PORT", 8080)?,
            mongodb_uri: get("MONGODB_URI"),
            mongodb_database: get("MONGODB_DATABASE").unwrap_or_else(|| "tertulia".to_string()),
            engine,
            bots,
        })
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| invalid(key, &raw)),
        None => Ok(default),
    }
}

/// Like [`parse_or`], but zero is rejected.
fn parse_positive_or<G>(get: &G, key: &str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match parse_or(get, key, default)? {
        0 => Err(invalid(key, "0")),
        value => Ok(value),
    }
}

fn bot_from_lookup<G>(get: &G, id: &str) -> Result<BotConfig, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let prefix = format!("BOT_{}_", id.to_uppercase());
    let key = |name: &str| format!("{prefix}{name}");

    let token_key = key("TOKEN");
    let token = get(&token_key).ok_or(ConfigError::Missing(token_key))?;

    let group_key = key("GROUP_ID");
    let raw_group = get(&group_key).ok_or_else(|| ConfigError::Missing(group_key.clone()))?;
    let group_id = raw_group
        .parse()
        .map_err(|_| invalid(&group_key, &raw_group))?;

    let repo_key = key("REPO_CHAT_ID");
    let repo_chat_id = get(&repo_key)
        .map(|raw| raw.parse().map_err(|_| invalid(&repo_key, &raw)))
        .transpose()?;

    // Parse sudo IDs
    let sudo_key = key("SUDO_IDS");
    let sudo_ids = get(&sudo_key)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u64>().map_err(|_| invalid(&sudo_key, s)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BotConfig {
        id: id.to_string(),
        token,
        group_id,
        repo_chat_id,
        sudo_ids,
        group_title: get(&key("GROUP_TITLE")).unwrap_or_else(|| "the group".to_string()),
        invite_link: get(&key("INVITE_LINK")),
        point_name: get(&key("POINT_NAME")).unwrap_or_else(|| "point".to_string()),
        points_name: get(&key("POINTS_NAME")).unwrap_or_else(|| "points".to_string()),
    })
}
