use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::json;

use crate::config::TELEGRAM;

/// Delivery channel for flip alerts. The engine only ever sees this
/// trait, so a dry run swaps in a logger without touching the wiring.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<()>;
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    url: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Credentials come from `TG_TOKEN` / `TG_CHAT`.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TELEGRAM.token_env)
            .with_context(|| format!("Missing environment variable {}", TELEGRAM.token_env))?;
        let chat_id = std::env::var(TELEGRAM.chat_env)
            .with_context(|| format!("Missing environment variable {}", TELEGRAM.chat_env))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(TELEGRAM.send_timeout_ms))
            .build()
            .context("Failed to build Telegram HTTP client")?;

        Ok(TelegramNotifier {
            client,
            url: format!("{}/bot{}/sendMessage", TELEGRAM.api_base, token),
            chat_id,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await
            .context("Telegram sendMessage request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Telegram rejected message: {} {}", status, body);
        }
        Ok(())
    }
}

/// Stands in for Telegram when running with `--dry-run`.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, text: &str) -> Result<()> {
        log::info!("[dry-run] {}", text);
        Ok(())
    }
}
