//! Single-shot product page fetcher

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::info;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A page fetch that did not produce markup. Callers must not retry.
#[derive(Debug, Error)]
#[error("Failed to fetch page: {message}")]
pub struct FetchError {
    pub url: String,
    pub message: String,
}

/// One GET with a fixed browser user-agent and a 10 second timeout.
///
/// No cookies, no sessions, no proxy handling. Anything other than a 2xx
/// response body is a `FetchError`.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        info!("Fetching product page: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError {
                url: url.to_string(),
                message: format!("HTTP status {status}"),
            });
        }

        response.text().await.map_err(|e| FetchError {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl Clone for PageFetcher {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}
