//! # Market News Relay
//!
//! Harvests short market news items from a news site, skips what was already
//! delivered inside the dedup window, filters by keyword policy and posts a
//! small batch to a Telegram chat. Meant to be run from cron; every
//! invocation is a single pass.
//!
//! ## Usage
//!
//! ```sh
//! market_news_relay --config config.yaml
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: Listing page URLs plus RSS metadata ([`scrapers`])
//! 2. **Resolution**: Fill missing titles and dates from detail pages ([`resolver`])
//! 3. **Selection**: Dedup window, freshness and keyword checks, oldest first ([`pipeline`])
//! 4. **Delivery**: Telegram message, then the history file is committed ([`outputs`], [`history`])

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod canonical;
mod cli;
mod config;
mod error;
mod filter;
mod history;
mod http;
mod models;
mod outputs;
mod pipeline;
mod resolver;
mod scrapers;
mod utils;

use cli::Cli;
use config::{AppConfig, FilterConfig};
use error::ConfigError;
use history::HistoryStore;
use http::HttpFetcher;
use outputs::telegram::TelegramNotifier;
use pipeline::{RunContext, RunOutcome, run_pipeline};
use scrapers::SourceSite;

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("market_news_relay starting up");

    // Cron runs without the operator's shell environment; credentials may
    // live in a .env file instead.
    if let Some(path) = config::load_dotenv() {
        info!(path = %path.display(), "Loaded environment file");
    }

    let args = Cli::parse();
    debug!(config = %args.config.display(), dry_run = args.dry_run, "Parsed CLI arguments");

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration error");
            return Err(e.into());
        }
    };

    let filters = FilterConfig::load(&config.filters_path);
    info!(
        allow = filters.allow_keywords.len(),
        block = filters.block_keywords.len(),
        window_hours = filters.window_hours,
        max_items = filters.max_items_per_run,
        "Filter config ready"
    );

    let site = SourceSite::from_config(&config)?;
    let fetcher = HttpFetcher::new(&config.http).map_err(ConfigError::Client)?;
    let notifier =
        TelegramNotifier::new(&config.telegram, config.http.timeout_secs).map_err(ConfigError::Client)?;

    let ctx = RunContext {
        site,
        filters,
        history: HistoryStore::new(&config.history_path),
        source_label: config.source_label.clone(),
        tag: config.tag.clone(),
        notify_on_empty: config.notify_on_empty,
        dry_run: args.dry_run,
    };
    debug!(history = %ctx.history.path().display(), listing = %ctx.site.listing_url, "Run context ready");

    let outcome = run_pipeline(&ctx, &fetcher, &notifier, Utc::now()).await;

    let elapsed = start_time.elapsed();
    match outcome {
        RunOutcome::Aborted { .. } | RunOutcome::DeliveryFailed { .. } => {
            error!(%outcome, elapsed_secs = elapsed.as_secs_f64(), "Run finished")
        }
        _ => info!(%outcome, elapsed_secs = elapsed.as_secs_f64(), "Run finished"),
    }

    Ok(())
}

/// Read the YAML config and apply command-line overrides.
fn load_config(args: &Cli) -> Result<AppConfig, ConfigError> {
    let mut config = AppConfig::load(&args.config)?;

    if let Some(path) = &args.filters {
        config.filters_path = path.clone();
    }
    if let Some(path) = &args.history {
        config.history_path = path.clone();
    }
    if args.telegram_bot_token.is_some() {
        config.telegram.bot_token = args.telegram_bot_token.clone();
    }
    if args.telegram_chat_id.is_some() {
        config.telegram.chat_id = args.telegram_chat_id.clone();
    }

    Ok(config)
}
