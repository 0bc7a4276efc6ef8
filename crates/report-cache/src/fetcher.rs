//! Network access for the offline cache.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::error::{CacheError, Result};
use crate::response::CachedResponse;

/// Fetches an asset from the network.
///
/// Implementations return whatever the server answered, including non-2xx
/// statuses; only transport failures are errors.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<CachedResponse>;
}

/// [`AssetFetcher`] backed by a `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an existing client (shared connection pool, custom timeouts).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<CachedResponse> {
        let network_err = |e: reqwest::Error| CacheError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(network_err)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(network_err)?;

        Ok(CachedResponse {
            url: url.to_string(),
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}
