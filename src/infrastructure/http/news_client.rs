//! News API HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::USER_AGENT;
use super::dto::NewsResponse;
use crate::domain::entities::News;
use crate::domain::errors::{NetworkError, NewsError};
use crate::domain::ports::NewsPort;

/// Default news API base URL.
pub const DEFAULT_NEWS_BASE_URL: &str = "https://webapi.autodoc.ru/api";

/// News API client.
pub struct NewsClient {
    client: Client,
    base_url: String,
}

impl NewsClient {
    /// Creates new client with default base URL.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new() -> Result<Self, NewsError> {
        Self::with_base_url(DEFAULT_NEWS_BASE_URL, Duration::from_secs(30))
    }

    /// Creates client with custom base URL and request timeout.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, NewsError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn page_url(&self, page: u32, items_per_page: u32) -> String {
        format!("{}/news/{page}/{items_per_page}", self.base_url)
    }
}

#[async_trait]
impl NewsPort for NewsClient {
    async fn fetch_news(&self, page: u32, items_per_page: u32) -> Result<Vec<News>, NewsError> {
        let url = self.page_url(page, items_per_page);
        debug!(page, items_per_page, "Fetching news page");

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(error = %e, "Failed to reach news API");
            NetworkError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
            }
            .into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::transport(format!("failed to read body: {e}")))?;

        let page_response: NewsResponse = serde_json::from_slice(&body).map_err(|e| {
            warn!(error = %e, "Failed to parse news response");
            NewsError::decoding(e.to_string())
        })?;

        let news = page_response
            .news
            .into_iter()
            .map(super::dto::NewsItem::into_news)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            page,
            received = news.len(),
            total = page_response.total_count,
            "News page loaded"
        );
        Ok(news)
    }
}
