//! Error types for the relay pipeline.
//!
//! Each stage of a run has its own error kind. Only [`FetchError`] on the
//! listing page aborts a run; every other kind degrades that stage and is
//! reported through logs.

use thiserror::Error;

/// The listing (or any page fetched through [`crate::http::Fetcher`]) could not be used.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure or an empty body.
    #[error("transport failure (http={status}): {message}")]
    Transport {
        /// HTTP status, `0` if no response was received
        status: u16,
        /// Error text reported by the transport
        message: String,
    },

    /// The server answered with a failure status.
    #[error("http status {status}")]
    Status {
        /// HTTP status code (>= 400)
        status: u16,
    },

    /// The page looks like an anti-automation challenge.
    #[error("anti-automation page detected (http={status}, marker={marker:?})")]
    Blocked {
        /// HTTP status of the challenge page
        status: u16,
        /// Marker that matched
        marker: String,
    },
}

impl FetchError {
    /// HTTP status attached to this failure, `0` if none.
    pub fn status(&self) -> u16 {
        match self {
            FetchError::Transport { status, .. }
            | FetchError::Status { status }
            | FetchError::Blocked { status, .. } => *status,
        }
    }
}

/// The structured feed could not be fetched or parsed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("feed is not valid RSS: {0}")]
    Xml(#[from] rss::Error),
}

/// A single candidate could not be turned into a [`crate::models::CandidateItem`].
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("article fetch failed: {0}")]
    ArticleFetch(#[from] FetchError),

    #[error("no title found after all fallbacks")]
    MissingTitle,

    #[error("no publish time found after all fallbacks")]
    MissingTimestamp,
}

/// Writing the dedup history failed. Logged and swallowed by the store.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid URL in {field}: {message}")]
    InvalidUrl { field: &'static str, message: String },

    #[error("unknown timezone {name:?}: {message}")]
    InvalidTimezone { name: String, message: String },

    #[error("cannot build title pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Delivery to Telegram failed. Collapsed to `false` at the notifier boundary.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("bot token or chat id is not configured")]
    NotConfigured,

    #[error("request failed (http={status}): {message}")]
    Transport { status: u16, message: String },

    #[error("reply is not JSON: {0}")]
    InvalidReply(#[from] serde_json::Error),

    #[error("telegram replied ok=false: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_status() {
        assert_eq!(FetchError::Status { status: 503 }.status(), 503);
        assert_eq!(
            FetchError::Transport {
                status: 0,
                message: "timeout".to_string()
            }
            .status(),
            0
        );
        let blocked = FetchError::Blocked {
            status: 200,
            marker: "captcha".to_string(),
        };
        assert_eq!(blocked.status(), 200);
        assert!(blocked.to_string().contains("captcha"));
    }

    #[test]
    fn test_resolve_error_from_fetch() {
        let err: ResolveError = FetchError::Status { status: 404 }.into();
        assert!(matches!(err, ResolveError::ArticleFetch(_)));
        assert_eq!(err.to_string(), "article fetch failed: http status 404");
    }
}
