use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::notify::WireAlert;

/// Delivery client for wire alerts
///
/// One outbound call per invocation; retries are the dispatch loop's
/// responsibility.
#[async_trait]
pub trait AlertSender: Send + Sync {
    /// POST the alert batch to `{base_url}/api/v1/alerts`, abandoning the
    /// request if it does not complete within `deadline`.
    async fn send(
        &self,
        base_url: &str,
        alerts: &[WireAlert],
        deadline: Duration,
    ) -> Result<(), DeliveryError>;
}

/// HTTP client posting alert batches to an Alertmanager-style receiver
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http_client: reqwest::Client,
}

impl WebhookClient {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }
}

impl Default for WebhookClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertSender for WebhookClient {
    async fn send(
        &self,
        base_url: &str,
        alerts: &[WireAlert],
        deadline: Duration,
    ) -> Result<(), DeliveryError> {
        let url = format!("{}/api/v1/alerts", base_url.trim_end_matches('/'));

        let body = serde_json::to_vec(alerts)
            .map_err(|e| DeliveryError::Serialization(e.to_string()))?;

        // Per-request timeout: each attempt gets a fresh deadline scoped to
        // this call only.
        let response = self
            .http_client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout(deadline)
                } else {
                    DeliveryError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(DeliveryError::Status(response.status().as_u16()));
        }

        tracing::debug!(url = %url, alerts = alerts.len(), "alert batch delivered");

        Ok(())
    }
}

/// Delivery errors
///
/// Callers treat these opaquely; the variants exist for log quality.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("Receiver returned status {0}")]
    Status(u16),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
