use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::retry::{is_retryable, truncate_body, RetryPolicy};

use super::Notifier;

const RETRY_DELAYS_SECS: [u64; 5] = [0, 2, 5, 10, 20];

/// Posts messages through the Telegram Bot API `sendMessage` method.
pub struct TelegramNotifier {
    http: Client,
    api_url: String,
    token: String,
    chat_id: String,
    retry: RetryPolicy,
}

impl TelegramNotifier {
    pub fn new(api_url: &str, token: &str, chat_id: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(TelegramNotifier {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
            retry: RetryPolicy::from_secs(&RETRY_DELAYS_SECS),
        })
    }

    #[cfg(test)]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.token);
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });

        let mut last_err = String::from("no attempts made");
        for attempt in 0..self.retry.attempts() {
            self.retry.wait(attempt).await;

            let resp = match self.http.post(&url).json(&payload).send().await {
                Ok(r) => r,
                Err(e) => {
                    // reqwest errors embed the URL, which carries the token
                    last_err = e.without_url().to_string();
                    warn!("Telegram request error: {}", last_err);
                    continue;
                }
            };

            let status = resp.status();
            if status.is_success() {
                debug!("Telegram message sent ({} chars)", text.chars().count());
                return Ok(());
            }

            let body = resp.text().await.unwrap_or_default();
            last_err = format!("Telegram HTTP {}: {}", status, truncate_body(&body, 200));
            if is_retryable(status) {
                warn!("{}, retrying", last_err);
                continue;
            }
            break;
        }

        warn!("Telegram send failed, message follows:\n{}", text);
        anyhow::bail!("Telegram send failed: {}", last_err)
    }
}
