//! Status list retrieval over HTTP(S), plus `file://` URLs for offline use.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use url::Url;
use veritas_status::{FetchError, StatusListFetcher};

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("veritas/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StatusListFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::Other(e.to_string()))?;
        if parsed.scheme() == "file" {
            let path = parsed
                .to_file_path()
                .map_err(|_| FetchError::Other(format!("not a local path: {}", url)))?;
            return tokio::fs::read(&path)
                .await
                .map(Bytes::from)
                .map_err(|e| FetchError::Other(format!("{}: {}", path.display(), e)));
        }

        tracing::debug!(url = %url, "fetching status list");
        let response = self.client.get(parsed).send().await.map_err(map_error)?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "status list fetch rejected");
            return Err(FetchError::Http(status.as_u16()));
        }
        response.bytes().await.map_err(map_error)
    }
}

fn map_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = e.status() {
        FetchError::Http(status.as_u16())
    } else {
        FetchError::Network(e.to_string())
    }
}
