//! Command-line interface definitions for the market news relay.
//!
//! Everything that describes the source site lives in the YAML config; the
//! flags here only pick files and override what differs between deployments.
//! Telegram credentials can also come from the environment.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Cron entry: one pass with the default config
/// market_news_relay --config /etc/news/config.yaml
///
/// # Try a new filter file without sending or remembering anything
/// market_news_relay --filters ./filters.json --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML config file (defaults apply when it does not exist)
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Filter config JSON, overriding `filters_path` from the config
    #[arg(short, long)]
    pub filters: Option<PathBuf>,

    /// Dedup history JSON, overriding `history_path` from the config
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Log the selected batch instead of sending it; history is not written
    #[arg(long)]
    pub dry_run: bool,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    /// Telegram chat id to deliver to (group and channel ids are negative)
    #[arg(long, env = "TELEGRAM_CHAT_ID", allow_negative_numbers = true)]
    pub telegram_chat_id: Option<String>,
}
