//! Delivery of report payloads to the report endpoint.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};

/// Longest response excerpt kept in a failure message.
const MAX_REASON_LEN: usize = 200;

/// Sends one report payload.
///
/// `Ok` means the endpoint accepted the payload; any `Err` leaves the
/// submission queued.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(&self, payload: &Value) -> Result<Value>;
}

/// [`Delivery`] that `POST`s JSON to `{api_base}/generate`.
#[derive(Debug, Clone)]
pub struct HttpDelivery {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpDelivery {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SyncError::Client(e.to_string()))?;
        Self::with_client(config, client)
    }

    /// Uses an existing client (shared pool, custom timeouts).
    pub fn with_client(config: &SyncConfig, client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: config.generate_url()?,
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_REASON_LEN {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(MAX_REASON_LEN).collect();
    cut.push_str("...");
    cut
}

#[async_trait]
impl Delivery for HttpDelivery {
    async fn deliver(&self, payload: &Value) -> Result<Value> {
        let mut request = self.client.post(self.endpoint.clone()).json(payload);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-KEY", key);
        }

        let response = request.send().await.map_err(|e| SyncError::DeliveryFailure {
            status: None,
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string()
            } else {
                excerpt(&body)
            };
            return Err(SyncError::DeliveryFailure {
                status: Some(status.as_u16()),
                reason,
            });
        }

        let body = response.bytes().await.map_err(|e| SyncError::DeliveryFailure {
            status: Some(status.as_u16()),
            reason: e.to_string(),
        })?;
        debug!(endpoint = %self.endpoint, status = status.as_u16(), "payload delivered");

        // A 2xx answer is a success even when the body is not JSON
        Ok(serde_json::from_slice(&body).unwrap_or(Value::Null))
    }
}
