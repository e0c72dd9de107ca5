//! Run orchestration.
//!
//! One invocation is one pass through these stages, in order:
//!
//! 1. Fetch the listing page. Failure aborts the run with an operator alert
//!    and leaves the history file untouched.
//! 2. Fetch the feed (best effort, see [`crate::scrapers::fetch_candidates`]).
//! 3. Load the history and prune it to the window, in memory.
//! 4. Resolve every listing URL not in the pruned history, then drop items
//!    outside the window or rejected by the keyword policy.
//! 5. Sort oldest first and keep at most `max_items_per_run`.
//! 6. Nothing left: persist the pruned history and stop.
//! 7. Deliver the batch.
//! 8. Delivered: record the URLs, prune again and persist. Not delivered:
//!    persist nothing.
//!
//! History is only written alongside an outcome that actually happened, so a
//! failed delivery is retried by the next run. A history write that fails
//! right after a delivery means the next run may deliver the same item again.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::fmt;
use tracing::{debug, error, info, instrument, warn};

use crate::config::FilterConfig;
use crate::filter;
use crate::history::{DedupHistory, HistoryStore};
use crate::http::Fetcher;
use crate::models::{CandidateItem, CanonicalUrl, EpochSeconds, FeedMetaMap};
use crate::outputs::message::{EmptyRunStats, format_abort_alert, format_empty_run_debug, format_news_batch};
use crate::outputs::telegram::Notifier;
use crate::resolver::resolve;
use crate::scrapers::{SourceSite, fetch_candidates};

/// Everything one run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub site: SourceSite,
    pub filters: FilterConfig,
    pub history: HistoryStore,
    /// Label in front of the source link, e.g. "Источник".
    pub source_label: String,
    /// Identifies this job in logs and operator messages.
    pub tag: String,
    pub notify_on_empty: bool,
    /// Log the batch instead of delivering it; nothing is sent or persisted.
    pub dry_run: bool,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The listing page could not be used; the operator was alerted.
    Aborted { status: u16 },
    /// Nothing new passed the filters.
    Empty,
    Delivered { count: usize },
    /// The notifier did not confirm delivery; history was not committed.
    DeliveryFailed { count: usize },
    DryRun { count: usize },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Aborted { status } => write!(f, "aborted (listing http={status})"),
            RunOutcome::Empty => write!(f, "no candidates"),
            RunOutcome::Delivered { count } => write!(f, "delivered {count} item(s)"),
            RunOutcome::DeliveryFailed { count } => write!(f, "delivery of {count} item(s) failed"),
            RunOutcome::DryRun { count } => write!(f, "dry run, {count} item(s) selected"),
        }
    }
}

/// Execute one pass of the pipeline.
///
/// # Arguments
///
/// * `ctx` - Site, filters, history location and run flags
/// * `fetcher` - HTTP fetch primitive
/// * `notifier` - Delivery channel for the batch and operator messages
/// * `now` - Reference time for windowing and for recorded deliveries; shown
///   in the site's zone in diagnostics
#[instrument(level = "info", skip_all, fields(tag = %ctx.tag, dry_run = ctx.dry_run))]
pub async fn run_pipeline<F: Fetcher, N: Notifier>(
    ctx: &RunContext,
    fetcher: &F,
    notifier: &N,
    now: DateTime<Utc>,
) -> RunOutcome {
    let now_ts = now.timestamp();
    let window = ctx.filters.window_seconds();

    let candidates = match fetch_candidates(fetcher, &ctx.site).await {
        Ok(candidates) => candidates,
        Err(e) => {
            let status = e.status();
            error!(http = status, error = %e, "Listing unavailable; aborting run");
            let alert = format_abort_alert(&ctx.tag, status, &e.to_string());
            if ctx.dry_run {
                info!(%alert, "Dry run; operator alert not sent");
            } else if !notifier.send(&alert, &ctx.tag).await {
                warn!("Operator alert could not be delivered");
            }
            return RunOutcome::Aborted { status };
        }
    };
    info!(urls = candidates.urls.len(), "Listing URLs extracted");

    let history = ctx.history.load().prune(now_ts, window);
    info!(history = history.len(), window_seconds = window, "History loaded and pruned");

    let fresh: Vec<&CanonicalUrl> = candidates
        .urls
        .iter()
        .filter(|url| !history.contains(url))
        .collect();
    debug!(
        fresh = fresh.len(),
        known = candidates.urls.len() - fresh.len(),
        "Split listing against history"
    );

    let mut batch: Vec<CandidateItem> = stream::iter(fresh)
        .then(|url| admit(ctx, fetcher, url, &candidates.feed_meta, now_ts))
        .filter_map(std::future::ready)
        .collect()
        .await;
    info!(candidates = batch.len(), "Candidates after filters");

    batch.sort_by_key(|item| item.published_at);
    batch.truncate(ctx.filters.max_items_per_run);

    if batch.is_empty() {
        if ctx.dry_run {
            info!("Dry run; nothing selected");
            return RunOutcome::Empty;
        }
        ctx.history.save_atomic(&history);
        if ctx.notify_on_empty {
            let stats = EmptyRunStats {
                listing_status: candidates.listing_status,
                listing_urls: candidates.urls.len(),
                feed_status: candidates.feed_status,
                feed_entries: candidates.feed_meta.len(),
                history_entries: history.len(),
                window_hours: ctx.filters.window_hours,
            };
            let local_now = now.with_timezone(&ctx.site.timezone);
            if !notifier
                .send(&format_empty_run_debug(&ctx.tag, &stats, local_now), &ctx.tag)
                .await
            {
                warn!("Empty-run diagnostic could not be delivered");
            }
        }
        return RunOutcome::Empty;
    }

    let count = batch.len();
    let text = format_news_batch(&batch, &ctx.source_label, &ctx.site.title_suffix);

    if ctx.dry_run {
        info!(count, %text, "Dry run; batch not delivered");
        return RunOutcome::DryRun { count };
    }

    if !notifier.send(&text, &ctx.tag).await {
        warn!(count, "Delivery failed; history not committed");
        return RunOutcome::DeliveryFailed { count };
    }
    info!(count, "Batch delivered");

    commit(&ctx.history, history, &batch, now_ts, window);
    RunOutcome::Delivered { count }
}

/// Resolve one URL and apply the window and keyword checks.
async fn admit<F: Fetcher>(
    ctx: &RunContext,
    fetcher: &F,
    url: &CanonicalUrl,
    feed_meta: &FeedMetaMap,
    now_ts: EpochSeconds,
) -> Option<CandidateItem> {
    let item = match resolve(fetcher, url, feed_meta.get(url), &ctx.site).await {
        Ok(item) => item,
        Err(e) => {
            debug!(%url, reason = %e, "Candidate dropped");
            return None;
        }
    };

    if item.published_at <= 0 || now_ts - item.published_at > ctx.filters.window_seconds() {
        debug!(%url, published_at = item.published_at, "Candidate outside window");
        return None;
    }

    if !filter::passes(
        &item.match_text(),
        &ctx.filters.allow_keywords,
        &ctx.filters.block_keywords,
    ) {
        debug!(%url, "Candidate rejected by keyword filter");
        return None;
    }

    Some(item)
}

fn commit(
    store: &HistoryStore,
    mut history: DedupHistory,
    delivered: &[CandidateItem],
    now_ts: EpochSeconds,
    window: i64,
) {
    for item in delivered {
        history.record(item.url.clone(), now_ts);
    }
    store.save_atomic(&history.prune(now_ts, window));
}
