//! Telegram message formatting.
//!
//! Messages use Telegram's HTML parse mode. Each delivered item becomes one
//! block: the bold title, a blank line, then the source name linking to the
//! article. Blocks are separated by a blank line.
//!
//! ```text
//! <b>Нефть дорожает</b>
//!
//! Источник: <a href="https://ru.investing.com/news/...">Investing.com</a>
//! ```

use chrono::DateTime;
use chrono_tz::Tz;
use std::fmt::Write;

use crate::models::CandidateItem;
use crate::utils::TitleSuffix;

/// Escape text for Telegram HTML.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Format a batch of items. An empty batch formats to an empty string.
///
/// `suffix` removes the site attribution some titles still carry.
pub fn format_news_batch(items: &[CandidateItem], source_label: &str, suffix: &TitleSuffix) -> String {
    items
        .iter()
        .map(|item| format_item(item, source_label, suffix))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_item(item: &CandidateItem, source_label: &str, suffix: &TitleSuffix) -> String {
    let title = escape_html(&suffix.strip(&item.title));
    let source = escape_html(&item.source);
    let url = item.url.as_str();

    let source_link = if url.is_empty() {
        source
    } else {
        format!(r#"<a href="{}">{}</a>"#, escape_html(url), source)
    };

    format!("<b>{title}</b>\n\n{}: {source_link}", escape_html(source_label))
}

/// Operator alert sent when the listing page is unreachable or blocked.
pub fn format_abort_alert(tag: &str, status: u16, reason: &str) -> String {
    format!(
        "⚠️ Error {}: listing unavailable (http={status}; {})",
        escape_html(tag),
        escape_html(reason)
    )
}

/// Counters reported in the optional empty-run diagnostic.
#[derive(Debug, Clone, Default)]
pub struct EmptyRunStats {
    pub listing_status: u16,
    pub listing_urls: usize,
    pub feed_status: u16,
    pub feed_entries: usize,
    pub history_entries: usize,
    pub window_hours: i64,
}

/// Diagnostic message for a run that selected nothing. `now` is shown in its own zone.
pub fn format_empty_run_debug(tag: &str, stats: &EmptyRunStats, now: DateTime<Tz>) -> String {
    let mut msg = String::new();
    let _ = writeln!(msg, "🧪 {} DEBUG", escape_html(tag));
    let _ = writeln!(
        msg,
        "listing http={}, urls={}",
        stats.listing_status, stats.listing_urls
    );
    let _ = writeln!(
        msg,
        "feed entries={} (http={})",
        stats.feed_entries, stats.feed_status
    );
    let _ = writeln!(msg, "history={}, candidates=0", stats.history_entries);
    let _ = writeln!(msg, "window_h={}", stats.window_hours);
    let _ = write!(msg, "server_time={}", now.format("%d.%m.%Y, %H:%M:%S"));
    msg
}
