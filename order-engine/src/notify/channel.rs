//! External delivery channels
//!
//! Delivery mechanics live outside the engine; a channel only has to accept a
//! notification or report why it didn't. No retries happen here.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use super::types::Notification;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Delivery request failed: {0}")]
    Request(String),

    #[error("Delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Pluggable external notification channel
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Channel name for logs
    fn name(&self) -> &'static str;

    /// Deliver one notification (best effort)
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Writes notifications to the log; the default when no webhook is configured
#[derive(Debug, Default)]
pub struct LogDeliveryChannel;

#[async_trait]
impl DeliveryChannel for LogDeliveryChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        tracing::info!(
            recipient = %notification.recipient,
            order_id = %notification.order_id,
            kind = ?notification.kind,
            title = %notification.title,
            "📨 Notification delivered"
        );
        Ok(())
    }
}

/// POSTs notifications as JSON to a webhook
pub struct WebhookDeliveryChannel {
    url: String,
    client: reqwest::Client,
}

impl WebhookDeliveryChannel {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DeliveryChannel for WebhookDeliveryChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&json!({
                "recipient": notification.recipient,
                "order_id": notification.order_id,
                "kind": notification.kind,
                "title": notification.title,
                "body": notification.body,
                "created_at": notification.created_at,
            }))
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected { status, body });
        }
        Ok(())
    }
}
