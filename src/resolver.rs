//! Article resolution.
//!
//! Turns a listing URL into a [`CandidateItem`]. Feed metadata is used as-is
//! when it has both a title and a publish time; otherwise the detail page is
//! fetched and the missing fields are filled from it. Fields already supplied
//! by the feed are never overwritten by page data.
//!
//! An article without a title or a publish time after all fallbacks is
//! dropped rather than given defaults: an unknown publish time cannot be
//! checked against the window.

use tracing::{debug, instrument};

use crate::error::ResolveError;
use crate::http::Fetcher;
use crate::models::{CandidateItem, CanonicalUrl, FeedMeta};
use crate::scrapers::SourceSite;
use crate::scrapers::article::extract_article;

/// Resolve one candidate.
///
/// # Arguments
///
/// * `fetcher` - Used for the detail page, with the cookie session
/// * `url` - Canonical article URL from the listing
/// * `feed_meta` - Feed entry for this URL, if the feed had one
/// * `site` - Name recorded on the item, title suffix and publishing zone
///
/// # Errors
///
/// [`ResolveError::ArticleFetch`] when the detail page was needed but could
/// not be fetched; [`ResolveError::MissingTitle`] /
/// [`ResolveError::MissingTimestamp`] when a field stays empty.
#[instrument(level = "debug", skip(fetcher, feed_meta, site), fields(%url))]
pub async fn resolve<F: Fetcher>(
    fetcher: &F,
    url: &CanonicalUrl,
    feed_meta: Option<&FeedMeta>,
    site: &SourceSite,
) -> Result<CandidateItem, ResolveError> {
    let mut meta = feed_meta.cloned().unwrap_or_default();

    if meta.is_complete() {
        debug!("Resolved from feed");
    } else {
        let body = fetcher.fetch(url.as_str(), true).await.into_body()?;
        let fields = extract_article(&body, &site.title_suffix, site.timezone);

        if meta.title.is_empty() {
            meta.title = fields.title.unwrap_or_default();
        }
        if meta.description.is_empty() {
            meta.description = fields.description.unwrap_or_default();
        }
        if meta.published_at == 0 {
            meta.published_at = fields.published_at.unwrap_or(0);
        }
        debug!(
            title_found = !meta.title.is_empty(),
            published_at = meta.published_at,
            "Resolved from detail page"
        );
    }

    if meta.title.is_empty() {
        return Err(ResolveError::MissingTitle);
    }
    if meta.published_at <= 0 {
        return Err(ResolveError::MissingTimestamp);
    }

    Ok(CandidateItem {
        url: url.clone(),
        title: meta.title,
        description: meta.description,
        source: site.name.clone(),
        published_at: meta.published_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::FetchError;
    use crate::http::FetchResponse;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct RecordingFetcher {
        pages: HashMap<String, FetchResponse>,
        calls: RefCell<Vec<String>>,
    }

    impl Fetcher for RecordingFetcher {
        async fn fetch(&self, url: &str, _with_cookies: bool) -> FetchResponse {
            self.calls.borrow_mut().push(url.to_string());
            self.pages.get(url).cloned().unwrap_or_else(|| FetchResponse::status(404))
        }
    }

    const URL: &str = "https://site.test/news/a-1";

    fn site() -> SourceSite {
        SourceSite::from_config(&AppConfig::default()).unwrap()
    }

    fn with_page(html: &str) -> RecordingFetcher {
        RecordingFetcher {
            pages: HashMap::from([(URL.to_string(), FetchResponse::ok(html))]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_complete_feed_meta_needs_no_fetch() {
        let fetcher = RecordingFetcher::default();
        let meta = FeedMeta {
            title: "Oil rises".to_string(),
            description: "Brent up".to_string(),
            published_at: 1_731_000_000,
        };
        let item = resolve(&fetcher, &CanonicalUrl::new(URL), Some(&meta), &site())
            .await
            .unwrap();

        assert!(fetcher.calls.borrow().is_empty());
        assert_eq!(item.title, "Oil rises");
        assert_eq!(item.description, "Brent up");
        assert_eq!(item.source, "Investing.com");
        assert_eq!(item.published_at, 1_731_000_000);
    }

    #[tokio::test]
    async fn test_missing_feed_date_filled_from_page_keeping_feed_title() {
        let fetcher = with_page(
            r#"<meta property="og:title" content="Page title">
               <meta property="og:description" content="Page description">
               <meta property="article:published_time" content="2024-11-07T17:20:00Z">"#,
        );
        let meta = FeedMeta {
            title: "Feed title".to_string(),
            description: String::new(),
            published_at: 0,
        };
        let item = resolve(&fetcher, &CanonicalUrl::new(URL), Some(&meta), &site())
            .await
            .unwrap();

        assert_eq!(fetcher.calls.borrow().len(), 1);
        assert_eq!(item.title, "Feed title");
        assert_eq!(item.description, "Page description");
        assert_eq!(item.published_at, 1_731_000_000);
    }

    #[tokio::test]
    async fn test_no_feed_entry_resolves_from_page() {
        let fetcher = with_page(
            r#"<title>Рубль слабеет - Investing.com</title>
               <script>{"datePublished":"2024-11-07T17:20:00Z"}</script>"#,
        );
        let item = resolve(&fetcher, &CanonicalUrl::new(URL), None, &site())
            .await
            .unwrap();
        assert_eq!(item.title, "Рубль слабеет");
        assert_eq!(item.description, "");
        assert_eq!(item.published_at, 1_731_000_000);
    }

    #[tokio::test]
    async fn test_unresolved_timestamp_is_dropped() {
        let fetcher = with_page(r#"<meta property="og:title" content="No date here">"#);
        let err = resolve(&fetcher, &CanonicalUrl::new(URL), None, &site())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::MissingTimestamp));
    }

    #[tokio::test]
    async fn test_missing_title_is_dropped() {
        let fetcher = with_page(r#"<meta property="article:published_time" content="2024-11-07T17:20:00Z">"#);
        let err = resolve(&fetcher, &CanonicalUrl::new(URL), None, &site())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::MissingTitle));
    }

    #[tokio::test]
    async fn test_article_fetch_failure_is_dropped() {
        let fetcher = RecordingFetcher::default();
        let err = resolve(&fetcher, &CanonicalUrl::new(URL), None, &site())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::ArticleFetch(FetchError::Status { status: 404 })
        ));
    }
}
