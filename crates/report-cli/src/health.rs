//! `GET /health` probe.

use std::time::Duration;

use tracing::debug;
use url::Url;

/// Liveness probe for the report service.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: reqwest::Client,
    url: Url,
}

impl HealthProbe {
    /// Creates a probe for `url` with a per-request timeout.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns true if the service answered 2xx.
    pub async fn check(&self) -> bool {
        match self.client.get(self.url.clone()).send().await {
            Ok(response) => {
                let ok = response.status().is_success();
                debug!(url = %self.url, status = response.status().as_u16(), "health probe");
                ok
            }
            Err(e) => {
                debug!(url = %self.url, error = %e, "health probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    async fn spawn(status: StatusCode) -> Url {
        let app = Router::new().route("/health", get(move || async move { status }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{}/health", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_healthy_service() {
        let url = spawn(StatusCode::OK).await;
        let probe = HealthProbe::new(url, Duration::from_secs(2)).unwrap();
        assert!(probe.check().await);
    }

    #[tokio::test]
    async fn test_unhealthy_service() {
        let url = spawn(StatusCode::SERVICE_UNAVAILABLE).await;
        let probe = HealthProbe::new(url, Duration::from_secs(2)).unwrap();
        assert!(!probe.check().await);
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let url = Url::parse(&format!("http://{}/health", addr)).unwrap();
        let probe = HealthProbe::new(url, Duration::from_secs(2)).unwrap();
        assert!(!probe.check().await);
    }
}
