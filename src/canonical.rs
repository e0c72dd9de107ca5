//! URL canonicalization.
//!
//! Articles reach the pipeline from three places (listing hrefs, feed links,
//! history keys) and each spells URLs slightly differently. Everything is
//! reduced to `https://{host}{path}` before it is compared or stored:
//!
//! - `http` is upgraded to `https`
//! - the fragment, query and port are dropped
//! - trailing slashes are removed, except for the root path
//!
//! Input that does not parse into an `http(s)` scheme, a host and a path is
//! returned unchanged.

use url::Url;

/// Reduce an article URL to its identity key.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(canonicalize("http://site.test/news/a/#top"), "https://site.test/news/a");
/// assert_eq!(canonicalize("/news/relative"), "/news/relative");
/// ```
pub fn canonicalize(raw: &str) -> String {
    let parsed = match Url::parse(raw.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return raw.to_string(),
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return raw.to_string();
    }
    let Some(host) = parsed.host_str() else {
        return raw.to_string();
    };

    let trimmed = parsed.path().trim_end_matches('/');
    let path = if trimmed.is_empty() { "/" } else { trimmed };

    format!("https://{host}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrades_scheme() {
        assert_eq!(
            canonicalize("http://ru.investing.com/news/stock-market-news/abc-123"),
            "https://ru.investing.com/news/stock-market-news/abc-123"
        );
        assert_eq!(
            canonicalize("HTTP://Site.Test/news/a"),
            "https://site.test/news/a"
        );
    }

    #[test]
    fn test_strips_fragment_query_and_trailing_slash() {
        assert_eq!(
            canonicalize("https://site.test/news/a/#comments"),
            "https://site.test/news/a"
        );
        assert_eq!(
            canonicalize("https://site.test/news/a?utm_source=rss"),
            "https://site.test/news/a"
        );
        assert_eq!(
            canonicalize("  https://site.test/news/a//  "),
            "https://site.test/news/a"
        );
    }

    #[test]
    fn test_keeps_root_path() {
        assert_eq!(canonicalize("https://site.test/"), "https://site.test/");
        assert_eq!(canonicalize("http://site.test"), "https://site.test/");
        assert_eq!(canonicalize("https://site.test//"), "https://site.test/");
    }

    #[test]
    fn test_unparseable_input_is_unchanged() {
        assert_eq!(canonicalize("/news/relative-path"), "/news/relative-path");
        assert_eq!(canonicalize(""), "");
        assert_eq!(canonicalize("not a url"), "not a url");
        assert_eq!(canonicalize("mailto:desk@site.test"), "mailto:desk@site.test");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "http://site.test/news/a/",
            "https://site.test/news/a#x",
            "https://SITE.test:8443/article/b///?q=1",
            "https://site.test",
            "https://site.test//",
            "/news/relative/",
            "ftp://files.site.test/x/",
            "garbage",
            "https://site.test/news/%D0%BD%D0%B5%D1%84%D1%82%D1%8C",
            "https://site.test/news/нефть/",
        ];
        for raw in inputs {
            let once = canonicalize(raw);
            assert_eq!(canonicalize(&once), once, "not idempotent for {raw:?}");
        }
    }
}
