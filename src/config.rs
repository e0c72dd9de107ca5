//! Runtime configuration.
//!
//! Two files feed a run:
//!
//! - **App config** (`config.yaml`): where to fetch from, how to talk HTTP,
//!   where state lives and how to reach Telegram. Missing file means defaults;
//!   an unreadable or invalid file is an error.
//! - **Filter config** (JSON, edited by operators): keyword policy, dedup
//!   window and batch size. Never an error; anything unusable falls back to
//!   defaults field by field.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

const DEFAULT_WINDOW_HOURS: i64 = 24;
const DEFAULT_MAX_ITEMS: usize = 1;

/// Top-level application configuration, read from YAML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Page listing the currently popular articles.
    pub listing_url: String,
    /// RSS feed used as a cheap metadata source.
    pub feed_url: String,
    /// Base used to resolve relative listing hrefs.
    pub site_base: String,
    /// Path prefixes that identify article pages.
    pub article_path_prefixes: Vec<String>,
    /// Display name of the site, also stripped from page titles.
    pub source_name: String,
    /// Label placed before the source link in messages.
    pub source_label: String,
    /// Tag attached to log spans and notifier calls.
    pub tag: String,
    /// Case-insensitive markers of an anti-automation page, matched against
    /// the whole listing HTML. Keep them specific to challenge pages.
    pub blocked_markers: Vec<String>,
    /// IANA zone for dates the site publishes without an offset, also used
    /// for the server time in diagnostics.
    pub timezone: String,
    pub filters_path: PathBuf,
    pub history_path: PathBuf,
    /// Send a diagnostic message when a run selects nothing.
    pub notify_on_empty: bool,
    pub http: HttpConfig,
    pub telegram: TelegramConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://ru.investing.com/news/most-popular-news".to_string(),
            feed_url: "https://ru.investing.com/rss/news.rss".to_string(),
            site_base: "https://ru.investing.com".to_string(),
            article_path_prefixes: vec!["/news/".to_string(), "/article/".to_string()],
            source_name: "Investing.com".to_string(),
            source_label: "Источник".to_string(),
            tag: "news_investing_popular".to_string(),
            blocked_markers: vec![
                "<title>Just a moment...</title>".to_string(),
                "<title>Access Denied</title>".to_string(),
                "<title>Attention Required! | Cloudflare</title>".to_string(),
                "cf-browser-verification".to_string(),
                "cf-chl-".to_string(),
                "Checking your browser before accessing".to_string(),
            ],
            timezone: "Europe/Kyiv".to_string(),
            filters_path: PathBuf::from("news_filters_investing_ru.json"),
            history_path: PathBuf::from("news_history_24h.json"),
            notify_on_empty: false,
            http: HttpConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

/// Settings for the HTTP fetch primitive.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
    pub referer: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "ru-RU,ru;q=0.9,en;q=0.8".to_string(),
            referer: "https://ru.investing.com/news".to_string(),
        }
    }
}

/// Telegram Bot API settings. Token and chat id usually come from the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token: None,
            chat_id: None,
        }
    }
}

impl AppConfig {
    /// Load the YAML app config, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: AppConfig = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}

/// Load `KEY=value` pairs from a `.env` file without overriding variables
/// that are already set.
///
/// The working directory and its parents are searched first, then the
/// directory of the executable, where cron deployments keep their secrets.
/// Returns the file that was loaded.
pub fn load_dotenv() -> Option<PathBuf> {
    if let Ok(path) = dotenvy::dotenv() {
        return Some(path);
    }
    let beside_exe = std::env::current_exe().ok()?.parent()?.join(".env");
    load_env_file(&beside_exe)
}

fn load_env_file(path: &Path) -> Option<PathBuf> {
    dotenvy::from_path(path).ok().map(|()| path.to_path_buf())
}

/// Keyword policy and run limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub allow_keywords: BTreeSet<String>,
    pub block_keywords: BTreeSet<String>,
    /// Dedup and freshness window in hours, at least 1.
    pub window_hours: i64,
    /// Upper bound on delivered items per run, at least 1.
    pub max_items_per_run: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            allow_keywords: BTreeSet::new(),
            block_keywords: BTreeSet::new(),
            window_hours: DEFAULT_WINDOW_HOURS,
            max_items_per_run: DEFAULT_MAX_ITEMS,
        }
    }
}

impl FilterConfig {
    /// Window length in seconds.
    pub fn window_seconds(&self) -> i64 {
        self.window_hours.saturating_mul(3600)
    }

    /// Load the filter file. A missing, unreadable or malformed file yields defaults.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Filter config unreadable; using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => {
                let config = Self::from_value(&value);
                debug!(?config, "Loaded filter config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Filter config is not JSON; using defaults");
                Self::default()
            }
        }
    }

    /// Build a config from arbitrary JSON, keeping every field that is usable.
    pub fn from_value(value: &Value) -> Self {
        let window_hours = value
            .get("window_hours")
            .and_then(as_integer)
            .unwrap_or(DEFAULT_WINDOW_HOURS)
            .max(1);
        let max_items_per_run = value
            .get("max_items_to_send")
            .and_then(as_integer)
            .map(|n| n.max(1) as usize)
            .unwrap_or(DEFAULT_MAX_ITEMS);

        Self {
            allow_keywords: keyword_set(value.get("allow_keywords")),
            block_keywords: keyword_set(value.get("block_keywords")),
            window_hours,
            max_items_per_run,
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn keyword_set(value: Option<&Value>) -> BTreeSet<String> {
    let Some(Value::Array(items)) = value else {
        return BTreeSet::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}
