//! Byte fetcher over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use tracing::{debug, trace};

use crate::domain::errors::NetworkError;
use crate::domain::ports::ByteFetcherPort;

use super::USER_AGENT;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Downloads response bodies with a shared reqwest client. One attempt, no retries.
#[derive(Debug, Clone)]
pub struct ReqwestByteFetcher {
    client: Client,
}

impl ReqwestByteFetcher {
    /// Creates a fetcher whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Creates a fetcher around an existing client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ByteFetcherPort for ReqwestByteFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes, NetworkError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NetworkError::invalid_url(url.as_str()));
        }

        trace!(url = %url, "Fetching bytes");
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %url, status = %status, "Fetch rejected by server");
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| NetworkError::transport(format!("failed to read body: {e}")))
    }
}
