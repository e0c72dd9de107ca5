//! Delivery to a Telegram chat.
//!
//! The pipeline only depends on the [`Notifier`] trait: hand over formatted
//! text, learn whether it was delivered. [`TelegramNotifier`] implements it
//! with the Bot API `sendMessage` method.

use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};

use crate::config::TelegramConfig;
use crate::error::NotifyError;
use crate::utils::truncate_for_log;

/// Downstream delivery channel.
pub trait Notifier {
    /// Deliver `text`; `true` only when the channel confirmed delivery.
    async fn send(&self, text: &str, tag: &str) -> bool;
}

#[derive(Debug, Deserialize)]
struct TelegramReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// [`Notifier`] posting HTML messages through the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone().filter(|t| !t.trim().is_empty()),
            chat_id: config.chat_id.clone().filter(|c| !c.trim().is_empty()),
        })
    }

    async fn try_send(&self, text: &str) -> Result<(), NotifyError> {
        let (Some(token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            return Err(NotifyError::NotConfigured);
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let form = [
            ("chat_id", chat_id.as_str()),
            ("text", text),
            ("parse_mode", "HTML"),
            ("disable_web_page_preview", "true"),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| NotifyError::Transport {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| NotifyError::Transport {
            status: status.as_u16(),
            message: e.to_string(),
        })?;

        let reply: TelegramReply = match serde_json::from_str(&body) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                return Err(NotifyError::Transport {
                    status: status.as_u16(),
                    message: truncate_for_log(&body, 200),
                });
            }
            Err(e) => return Err(NotifyError::InvalidReply(e)),
        };

        if reply.ok {
            Ok(())
        } else {
            Err(NotifyError::Rejected(
                reply.description.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

impl Notifier for TelegramNotifier {
    #[instrument(level = "info", skip(self, text), fields(chars = text.chars().count()))]
    async fn send(&self, text: &str, tag: &str) -> bool {
        let t0 = Instant::now();
        match self.try_send(text).await {
            Ok(()) => {
                info!(elapsed_ms = t0.elapsed().as_millis() as u64, "Telegram message sent");
                true
            }
            Err(e) => {
                error!(error = %e, "Telegram delivery failed");
                false
            }
        }
    }
}
