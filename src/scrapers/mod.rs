//! Source scrapers for discovering candidate articles.
//!
//! Discovery follows the same two-phase pattern as any news scraper:
//!
//! 1. **Indexing**: [`fetch_candidates`] reads the listing page (required) and
//!    the RSS feed (optional) and returns canonical URLs plus feed metadata.
//! 2. **Fetching**: [`article`] pulls title, description and publish time
//!    from a detail page when the feed did not already supply them.
//!
//! # Submodules
//!
//! | Module | Input | Output |
//! |--------|-------|--------|
//! | [`listing`] | listing HTML | article URLs, anti-automation check |
//! | [`feed`] | RSS XML | metadata keyed by canonical URL |
//! | [`article`] | detail page HTML | title / description / publish time |

pub mod article;
pub mod feed;
pub mod listing;

use chrono_tz::Tz;
use tracing::{info, instrument, warn};
use url::Url;

use crate::config::AppConfig;
use crate::error::{ConfigError, FeedError, FetchError};
use crate::http::Fetcher;
use crate::models::{Candidates, FeedMetaMap};
use crate::utils::TitleSuffix;

/// Where and how to discover articles on the source site.
#[derive(Debug, Clone)]
pub struct SourceSite {
    pub listing_url: String,
    pub feed_url: String,
    pub base: Url,
    pub article_path_prefixes: Vec<String>,
    pub blocked_markers: Vec<String>,
    /// Display name, recorded on every item.
    pub name: String,
    /// Attribution stripped from titles, built from `name`.
    pub title_suffix: TitleSuffix,
    /// Zone for dates published without an offset.
    pub timezone: Tz,
}

impl SourceSite {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&config.site_base).map_err(|e| ConfigError::InvalidUrl {
            field: "site_base",
            message: e.to_string(),
        })?;
        let timezone = config
            .timezone
            .trim()
            .parse::<Tz>()
            .map_err(|e| ConfigError::InvalidTimezone {
                name: config.timezone.clone(),
                message: e.to_string(),
            })?;
        Ok(Self {
            listing_url: config.listing_url.clone(),
            feed_url: config.feed_url.clone(),
            base,
            article_path_prefixes: config.article_path_prefixes.clone(),
            blocked_markers: config.blocked_markers.clone(),
            name: config.source_name.clone(),
            title_suffix: TitleSuffix::new(&config.source_name)?,
            timezone,
        })
    }
}

/// Fetch the listing page and the feed.
///
/// # Errors
///
/// Returns [`FetchError`] when the listing page cannot be fetched or looks like
/// an anti-automation challenge. Feed problems are logged and produce an empty
/// metadata map instead.
#[instrument(level = "info", skip_all, fields(listing = %site.listing_url))]
pub async fn fetch_candidates<F: Fetcher>(fetcher: &F, site: &SourceSite) -> Result<Candidates, FetchError> {
    let listing = fetcher.fetch(&site.listing_url, true).await;
    let listing_status = listing.status;
    info!(http = listing.status, err = %listing.error, "Listing fetched");

    let html = listing.into_body()?;
    if let Some(marker) = listing::find_block_marker(&html, &site.blocked_markers) {
        return Err(FetchError::Blocked {
            status: listing_status,
            marker: marker.to_string(),
        });
    }
    let urls = listing::extract_article_urls(&html, &site.base, &site.article_path_prefixes);

    let (feed_meta, feed_status) = match fetch_feed(fetcher, &site.feed_url, site.timezone).await {
        Ok(result) => result,
        Err((e, status)) => {
            warn!(error = %e, "Feed unavailable; continuing without feed metadata");
            (FeedMetaMap::new(), status)
        }
    };
    info!(http = feed_status, mapped = feed_meta.len(), "Feed processed");

    Ok(Candidates {
        urls,
        feed_meta,
        listing_status,
        feed_status,
    })
}

async fn fetch_feed<F: Fetcher>(
    fetcher: &F,
    feed_url: &str,
    timezone: Tz,
) -> Result<(FeedMetaMap, u16), (FeedError, u16)> {
    let response = fetcher.fetch(feed_url, false).await;
    let status = response.status;
    let xml = response
        .into_body()
        .map_err(|e| (FeedError::from(e), status))?;
    let map = feed::parse_feed(&xml, timezone).map_err(|e| (e, status))?;
    Ok((map, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::FetchResponse;
    use crate::models::CanonicalUrl;
    use std::collections::HashMap;

    struct MapFetcher(HashMap<&'static str, FetchResponse>);

    impl Fetcher for MapFetcher {
        async fn fetch(&self, url: &str, _with_cookies: bool) -> FetchResponse {
            self.0.get(url).cloned().unwrap_or_else(|| FetchResponse::status(404))
        }
    }

    fn site() -> SourceSite {
        SourceSite::from_config(&AppConfig {
            listing_url: "https://site.test/popular".to_string(),
            feed_url: "https://site.test/rss".to_string(),
            site_base: "https://site.test".to_string(),
            ..AppConfig::default()
        })
        .unwrap()
    }

    const LISTING: &str = r#"<a href="/news/a-1">A</a><a href="/news/b-2/">B</a>"#;
    const FEED: &str = r#"<rss><channel><item><title>A</title><link>https://site.test/news/a-1</link>
        <pubDate>2024-11-07T17:20:00Z</pubDate></item></channel></rss>"#;

    #[tokio::test]
    async fn test_listing_and_feed() {
        let fetcher = MapFetcher(HashMap::from([
            ("https://site.test/popular", FetchResponse::ok(LISTING)),
            ("https://site.test/rss", FetchResponse::ok(FEED)),
        ]));
        let candidates = fetch_candidates(&fetcher, &site()).await.unwrap();

        assert_eq!(candidates.urls.len(), 2);
        assert!(candidates.urls.contains(&CanonicalUrl::new("https://site.test/news/b-2")));
        assert_eq!(candidates.feed_meta.len(), 1);
        assert_eq!(candidates.listing_status, 200);
        assert_eq!(candidates.feed_status, 200);
    }

    #[tokio::test]
    async fn test_feed_failure_is_not_fatal() {
        let fetcher = MapFetcher(HashMap::from([
            ("https://site.test/popular", FetchResponse::ok(LISTING)),
            ("https://site.test/rss", FetchResponse::ok("<html>not a feed")),
        ]));
        let candidates = fetch_candidates(&fetcher, &site()).await.unwrap();
        assert_eq!(candidates.urls.len(), 2);
        assert!(candidates.feed_meta.is_empty());

        let fetcher = MapFetcher(HashMap::from([(
            "https://site.test/popular",
            FetchResponse::ok(LISTING),
        )]));
        let candidates = fetch_candidates(&fetcher, &site()).await.unwrap();
        assert!(candidates.feed_meta.is_empty());
        assert_eq!(candidates.feed_status, 404);
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let fetcher = MapFetcher(HashMap::from([(
            "https://site.test/popular",
            FetchResponse::status(503),
        )]));
        let err = fetch_candidates(&fetcher, &site()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn test_listing_challenge_page_is_fatal() {
        let fetcher = MapFetcher(HashMap::from([(
            "https://site.test/popular",
            FetchResponse::ok("<title>Just a moment...</title>"),
        )]));
        let err = fetch_candidates(&fetcher, &site()).await.unwrap_err();
        assert!(matches!(err, FetchError::Blocked { status: 200, .. }));
    }

    #[test]
    fn test_source_site_rejects_bad_base() {
        let config = AppConfig {
            site_base: "not a url".to_string(),
            ..AppConfig::default()
        };
        assert!(SourceSite::from_config(&config).is_err());
    }

    #[test]
    fn test_source_site_timezone() {
        assert_eq!(site().timezone, chrono_tz::Europe::Kyiv);

        let config = AppConfig {
            timezone: "Mars/Olympus_Mons".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            SourceSite::from_config(&config),
            Err(ConfigError::InvalidTimezone { .. })
        ));
    }
}
