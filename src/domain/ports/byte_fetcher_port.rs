//! Port for downloading raw bytes.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;

use crate::domain::errors::NetworkError;

/// Fetches the body behind a URL. No caching, no deduplication.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ByteFetcherPort: Send + Sync {
    /// Downloads the body. Non-2xx responses are errors.
    async fn fetch(&self, url: &Url) -> Result<Bytes, NetworkError>;
}
