//! Text and time helpers shared by the scrapers, the resolver and the formatter.
//!
//! - Markup-to-text normalization for feed and page metadata
//! - Site-attribution stripping for page titles
//! - Lenient date-time parsing for feed and page timestamps
//! - String truncation for log fields

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use itertools::Itertools;
use regex::Regex;
use scraper::Html;

use crate::models::EpochSeconds;

/// Decode entities, drop tags and collapse whitespace.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(norm_text("<p>Oil&nbsp;&amp; gas</p>\n  up"), "Oil & gas up");
/// ```
pub fn norm_text(s: &str) -> String {
    if s.trim().is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(s);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().join(" ")
}

/// Strips a trailing site attribution such as `" - Investing.com"`,
/// `" | Investing.com Россия"` or `" от Investing.com"` from titles.
///
/// Built once per site name; the patterns are reused for every title.
#[derive(Debug, Clone)]
pub struct TitleSuffix {
    patterns: Vec<Regex>,
}

impl TitleSuffix {
    pub fn new(site: &str) -> Result<Self, regex::Error> {
        let site = regex::escape(site.trim());
        if site.is_empty() {
            return Ok(Self { patterns: Vec::new() });
        }
        let patterns = [
            format!(r"(?iu)\s*[-—|]\s*{site}.*$"),
            format!(r"(?iu)\s+от\s+{site}\s*$"),
        ]
        .iter()
        .map(|p| Regex::new(p))
        .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn strip(&self, title: &str) -> String {
        self.patterns
            .iter()
            .fold(title.trim().to_string(), |out, re| {
                re.replace(&out, "").trim().to_string()
            })
    }
}

/// Parse a feed or page date-time into epoch seconds.
///
/// Accepts RFC 3339 and RFC 2822, the common ISO-like variants with an
/// offset, and offset-less date-times, which are read in `zone` (the site's
/// publishing zone, not the host's). Returns `None` when nothing matches.
pub fn parse_timestamp(raw: &str, zone: Tz) -> Option<EpochSeconds> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.timestamp());
    }

    const WITH_OFFSET: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S %z",
    ];
    for fmt in WITH_OFFSET {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.timestamp());
        }
    }

    const NAIVE: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%d.%m.%Y %H:%M",
    ];
    for fmt in NAIVE {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return zoned_timestamp(naive, zone);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|naive| zoned_timestamp(naive, zone))
}

fn zoned_timestamp(naive: NaiveDateTime, zone: Tz) -> Option<EpochSeconds> {
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}
