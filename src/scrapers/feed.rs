//! RSS feed scraper.
//!
//! The feed is a shortcut: when an article from the listing also appears in
//! the feed with a title and a date, no detail page has to be fetched. Entries
//! are reduced to typed records at this boundary. Namespaced extras such as
//! `<atom:link>` or `<media:title>` are ignored, an entry without a title or
//! link is skipped, and an unparseable `pubDate` becomes `0`.

use chrono_tz::Tz;
use tracing::{debug, instrument};

use crate::error::FeedError;
use crate::models::{CanonicalUrl, FeedMeta, FeedMetaMap};
use crate::utils::{norm_text, parse_timestamp};

/// Parse an RSS document into metadata keyed by canonical link.
///
/// When two entries share a canonical link, the later one wins. Dates
/// without an offset are read in `timezone`.
#[instrument(level = "debug", skip_all, fields(bytes = xml.len()))]
pub fn parse_feed(xml: &str, timezone: Tz) -> Result<FeedMetaMap, FeedError> {
    let channel = xml.parse::<rss::Channel>()?;

    let mut map = FeedMetaMap::new();
    let mut skipped = 0usize;
    for item in channel.items() {
        let title = norm_text(item.title().unwrap_or_default());
        let link = item.link().unwrap_or_default().trim();
        if title.is_empty() || link.is_empty() {
            skipped += 1;
            continue;
        }

        let published_at = item
            .pub_date()
            .and_then(|raw| parse_timestamp(raw, timezone))
            .unwrap_or(0);

        map.insert(
            CanonicalUrl::new(link),
            FeedMeta {
                title,
                description: norm_text(item.description().unwrap_or_default()),
                published_at,
            },
        );
    }

    debug!(mapped = map.len(), skipped, "Parsed feed entries");
    Ok(map)
}
