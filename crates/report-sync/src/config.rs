//! Sync configuration.

use std::time::Duration;

use url::Url;

use crate::error::{Result, SyncError};

/// Tag carried by connectivity-restored triggers.
pub const SYNC_TAG: &str = "sync-reports";

/// Failed attempts after which an entry is reported as stalled.
pub const DEFAULT_STALL_THRESHOLD: u32 = 20;

/// Configuration for delivery and background sync.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the report service; `generate` and `health` resolve
    /// under it.
    pub api_base: Url,
    /// Sent as `X-API-KEY` when set.
    pub api_key: Option<String>,
    /// Failed attempts before an entry is reported as stalled (0 disables).
    pub stall_threshold: u32,
    /// Trigger tag the runtime answers to.
    pub tag: String,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
    /// Timeout for a single delivery request; the client default when unset.
    pub request_timeout: Option<Duration>,
}

impl SyncConfig {
    /// Creates a config for the service at `api_base`.
    pub fn new(api_base: &str) -> Result<Self> {
        let mut base = Url::parse(api_base).map_err(|source| SyncError::InvalidEndpoint {
            url: api_base.to_string(),
            source,
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            api_base: base,
            api_key: None,
            stall_threshold: DEFAULT_STALL_THRESHOLD,
            tag: SYNC_TAG.to_string(),
            event_capacity: 64,
            request_timeout: None,
        })
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    /// Sets the stall threshold.
    pub fn with_stall_threshold(mut self, threshold: u32) -> Self {
        self.stall_threshold = threshold;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the trigger tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base
            .join(path)
            .map_err(|source| SyncError::InvalidEndpoint {
                url: format!("{}{}", self.api_base, path),
                source,
            })
    }

    /// `POST` target for report payloads.
    pub fn generate_url(&self) -> Result<Url> {
        self.endpoint("generate")
    }

    /// Liveness probe URL.
    pub fn health_url(&self) -> Result<Url> {
        self.endpoint("health")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::new("http://127.0.0.1:8080").unwrap();
        assert_eq!(config.stall_threshold, 20);
        assert_eq!(config.tag, "sync-reports");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_endpoints_under_sub_path() {
        let config = SyncConfig::new("https://bot.example/api").unwrap();
        assert_eq!(
            config.generate_url().unwrap().as_str(),
            "https://bot.example/api/generate"
        );
        assert_eq!(
            config.health_url().unwrap().as_str(),
            "https://bot.example/api/health"
        );
    }

    #[test]
    fn test_builder() {
        let config = SyncConfig::new("http://localhost/")
            .unwrap()
            .with_api_key("secret")
            .with_stall_threshold(3)
            .with_tag("other")
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.stall_threshold, 3);
        assert_eq!(config.tag, "other");
    }

    #[test]
    fn test_blank_api_key_is_none() {
        let config = SyncConfig::new("http://localhost/").unwrap().with_api_key("  ");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_invalid_base() {
        assert!(matches!(
            SyncConfig::new("::nope"),
            Err(SyncError::InvalidEndpoint { .. })
        ));
    }
}
