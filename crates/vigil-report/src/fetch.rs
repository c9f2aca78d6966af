//! Report fetching — HTTP retrieval of the raw status page.

use std::time::Duration;

use async_trait::async_trait;

use vigil_core::error::{Result, VigilError};

/// Retrieves raw source content for the report parser.
/// Implementations enforce their own timeout; any failure surfaces as
/// [`VigilError::Fetch`] and is never fatal to the scheduler loop.
#[async_trait]
pub trait ReportFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>>;
}

/// Fetches the status page over HTTP(S) with a fixed per-call timeout.
pub struct HttpFetcher {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReportFetcher for HttpFetcher {
    async fn fetch(&self) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| VigilError::Fetch(format!("{}: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(VigilError::Fetch(format!(
                "{}: status {status}",
                self.url
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| VigilError::Fetch(format!("{}: body read: {e}", self.url)))?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction() {
        let f = HttpFetcher::new("http://localhost:9/status", Duration::from_secs(10));
        assert_eq!(f.url(), "http://localhost:9/status");
    }

    #[tokio::test]
    async fn test_unreachable_is_fetch_error() {
        // Port 9 (discard) is not listening; connection fails fast.
        let f = HttpFetcher::new("http://127.0.0.1:9/status", Duration::from_secs(2));
        match f.fetch().await {
            Err(VigilError::Fetch(msg)) => assert!(msg.contains("127.0.0.1")),
            other => panic!("expected Fetch error, got {other:?}"),
        }
    }
}
