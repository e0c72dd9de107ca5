//! Listing page scraper.
//!
//! The listing page ("most popular news") is the authoritative source of
//! candidates. Every element carrying an `href` is inspected; hrefs whose path
//! starts with one of the configured article prefixes are kept, whether they
//! are written site-relative (`/news/...`) or absolute on the same host.

use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::{debug, info};
use url::Url;

use crate::models::CanonicalUrl;

/// Return the first anti-automation marker found in `html`, if any.
///
/// Matching is case-insensitive. Challenge pages are often served with a
/// success status, so this runs regardless of the HTTP code.
pub fn find_block_marker<'a>(html: &str, markers: &'a [String]) -> Option<&'a str> {
    let lowered = html.to_lowercase();
    markers
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .find(|m| lowered.contains(&m.to_lowercase()))
}

/// Extract canonical article URLs from the listing page.
///
/// # Arguments
///
/// * `html` - Listing page body
/// * `base` - Site root used to resolve relative hrefs; absolute hrefs must share its host
/// * `prefixes` - Path prefixes identifying article pages (e.g. `/news/`)
pub fn extract_article_urls(html: &str, base: &Url, prefixes: &[String]) -> BTreeSet<CanonicalUrl> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("[href]") else {
        return BTreeSet::new();
    };

    let mut urls = BTreeSet::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Some(url) = article_url(href.trim(), base, prefixes) {
            urls.insert(url);
        }
    }

    info!(count = urls.len(), "Extracted listing article URLs");
    debug!(urls = ?urls, "Listing URLs");
    urls
}

fn article_url(href: &str, base: &Url, prefixes: &[String]) -> Option<CanonicalUrl> {
    let resolved = if href.starts_with('/') && !href.starts_with("//") {
        base.join(href).ok()?
    } else {
        let absolute = Url::parse(href).ok()?;
        if !matches!(absolute.scheme(), "http" | "https") || absolute.host_str() != base.host_str() {
            return None;
        }
        absolute
    };

    let path = resolved.path();
    let is_article = prefixes
        .iter()
        .any(|prefix| path.starts_with(prefix.as_str()) && path.len() > prefix.len());
    if !is_article {
        return None;
    }

    Some(CanonicalUrl::new(resolved.as_str()))
}
