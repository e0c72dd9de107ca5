//! Data models for harvested news items.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`CanonicalUrl`]: The identity key of an article, used for deduplication
//! - [`FeedMeta`]: Metadata supplied by the structured feed for one article
//! - [`Candidates`]: Listing URLs plus feed metadata gathered at the start of a run
//! - [`CandidateItem`]: A fully resolved article eligible for delivery

use crate::canonical::canonicalize;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Seconds since the Unix epoch. `0` means "unresolved".
pub type EpochSeconds = i64;

/// A canonicalized article URL.
///
/// The only way to build one is through [`CanonicalUrl::new`], which runs the
/// canonicalizer, so two values compare equal exactly when they refer to the
/// same article. Deserialization canonicalizes as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    pub fn new(raw: &str) -> Self {
        Self(canonicalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CanonicalUrl {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<CanonicalUrl> for String {
    fn from(url: CanonicalUrl) -> Self {
        url.0
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata for one article as published in the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedMeta {
    pub title: String,
    pub description: String,
    /// Publish time, `0` when the feed entry had no parseable date.
    pub published_at: EpochSeconds,
}

impl FeedMeta {
    /// Whether this entry alone is enough to build a candidate without
    /// fetching the detail page.
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && self.published_at != 0
    }
}

/// Feed metadata keyed by canonical URL.
pub type FeedMetaMap = HashMap<CanonicalUrl, FeedMeta>;

/// Everything the source aggregator gathered for one run.
#[derive(Debug, Default)]
pub struct Candidates {
    /// Article URLs found on the listing page, duplicates collapsed.
    pub urls: BTreeSet<CanonicalUrl>,
    /// Metadata from the feed; empty when the feed was unavailable.
    pub feed_meta: FeedMetaMap,
    pub listing_status: u16,
    /// `0` when the feed request never got a response.
    pub feed_status: u16,
}

/// A resolved article ready for filtering and delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    pub url: CanonicalUrl,
    pub title: String,
    pub description: String,
    /// Display name of the site the item came from.
    pub source: String,
    pub published_at: EpochSeconds,
}

impl CandidateItem {
    /// Title and description joined by a single space, used for keyword matching.
    pub fn match_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_url_equality_ignores_spelling() {
        let a = CanonicalUrl::new("http://site.test/news/a/");
        let b = CanonicalUrl::new("https://site.test/news/a#comments");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "https://site.test/news/a");
    }

    #[test]
    fn test_canonical_url_serializes_as_plain_string() {
        let url = CanonicalUrl::new("https://site.test/news/x");
        let json = serde_json::to_string(&url).unwrap();
        assert_eq!(json, r#""https://site.test/news/x""#);

        let back: CanonicalUrl = serde_json::from_str(r#""http://site.test/news/x/""#).unwrap();
        assert_eq!(back, url);
    }

    #[test]
    fn test_feed_meta_completeness() {
        let mut meta = FeedMeta {
            title: "Oil rises".to_string(),
            description: String::new(),
            published_at: 1_731_000_000,
        };
        assert!(meta.is_complete());

        meta.published_at = 0;
        assert!(!meta.is_complete());

        meta.published_at = 1_731_000_000;
        meta.title.clear();
        assert!(!meta.is_complete());
    }

    #[test]
    fn test_match_text_joins_with_single_space() {
        let item = CandidateItem {
            url: CanonicalUrl::new("https://site.test/news/x"),
            title: "Gold".to_string(),
            description: "hits record".to_string(),
            source: "Site".to_string(),
            published_at: 1,
        };
        assert_eq!(item.match_text(), "Gold hits record");
    }
}
