//! HTTP fetch primitive.
//!
//! The pipeline only ever needs "give me the body of this URL". That need is
//! expressed as the [`Fetcher`] trait so the orchestrator can be driven by
//! [`HttpFetcher`] in production and by in-memory fakes in tests.

use reqwest::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::config::HttpConfig;
use crate::error::FetchError;

/// Raw outcome of a single fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    /// Response body, `None` when the request failed or the body was empty.
    pub body: Option<String>,
    /// HTTP status, `0` when no response was received.
    pub status: u16,
    /// Transport error text, empty on success.
    pub error: String,
}

impl FetchResponse {
    /// A successful response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            status: 200,
            error: String::new(),
        }
    }

    /// A response that carried only a status code.
    pub fn status(status: u16) -> Self {
        Self {
            body: None,
            status,
            error: String::new(),
        }
    }

    /// Treat a missing body or a status >= 400 as failure.
    pub fn into_body(self) -> Result<String, FetchError> {
        if self.status >= 400 {
            return Err(FetchError::Status {
                status: self.status,
            });
        }
        match self.body {
            Some(body) => Ok(body),
            None => Err(FetchError::Transport {
                status: self.status,
                message: if self.error.is_empty() {
                    "empty body".to_string()
                } else {
                    self.error
                },
            }),
        }
    }
}

/// Anything that can retrieve a URL.
///
/// `with_cookies` selects the session that keeps cookies between requests;
/// the listing and article pages share it, the feed does not.
pub trait Fetcher {
    async fn fetch(&self, url: &str, with_cookies: bool) -> FetchResponse;
}

/// [`Fetcher`] backed by `reqwest`, sending browser-like headers.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    session: Client,
    plain: Client,
}

impl HttpFetcher {
    /// Build both clients from the HTTP settings.
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            session: Self::builder(config)?.cookie_store(true).build()?,
            plain: Self::builder(config)?.build()?,
        })
    }

    fn builder(config: &HttpConfig) -> Result<reqwest::ClientBuilder, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );
        if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
            headers.insert(header::ACCEPT_LANGUAGE, value);
        }
        if let Ok(value) = HeaderValue::from_str(&config.referer) {
            headers.insert(header::REFERER, value);
        }

        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        Ok(Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(timeout))
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str, with_cookies: bool) -> FetchResponse {
        let t0 = Instant::now();
        let client = if with_cookies { &self.session } else { &self.plain };

        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, error = %e, "Request failed");
                return FetchResponse {
                    body: None,
                    status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                    error: e.to_string(),
                };
            }
        };

        let status = response.status().as_u16();
        let (body, error) = match response.text().await {
            Ok(text) if text.is_empty() => (None, String::new()),
            Ok(text) => (Some(text), String::new()),
            Err(e) => (None, e.to_string()),
        };
        debug!(
            %url,
            status,
            bytes = body.as_ref().map(String::len).unwrap_or(0),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched"
        );

        FetchResponse {
            body,
            status,
            error,
        }
    }
}
