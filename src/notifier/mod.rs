//! Notifier - best-effort delivery of alert text to a chat channel

pub mod format;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{NotifierConfig, NotifierKind};

pub use format::{alert_text, cycle_header};

/// Outbound message sink. Delivery is best-effort and nothing is reported back.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel_id: &str, text: &str);
}

/// Writes messages to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, channel_id: &str, text: &str) {
        tracing::info!(channel = %channel_id, "📣 {}", text);
    }
}

/// Posts `{"content": text}` to a chat webhook
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create webhook HTTP client")?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, channel_id: &str, text: &str) {
        let payload = serde_json::json!({ "content": text });

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(channel = %channel_id, "Webhook message delivered");
            }
            Ok(response) => {
                tracing::warn!(
                    channel = %channel_id,
                    status = %response.status(),
                    "Webhook rejected message"
                );
            }
            Err(e) => {
                tracing::warn!(channel = %channel_id, error = %e, "Webhook delivery failed");
            }
        }
    }
}

/// Build the configured notifier
pub fn build_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
    match config.kind {
        NotifierKind::Log => Ok(Arc::new(LogNotifier)),
        NotifierKind::Webhook => {
            let url = config
                .webhook_url
                .as_deref()
                .context("notifier.webhook_url is not set")?;
            Ok(Arc::new(WebhookNotifier::new(url)?))
        }
    }
}
