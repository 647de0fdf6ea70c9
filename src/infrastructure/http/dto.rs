use chrono::NaiveDateTime;
use reqwest::Url;
use serde::Deserialize;

use crate::domain::entities::News;
use crate::domain::errors::NewsError;

const PUBLISHED_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// News page response structure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    /// Articles on this page.
    pub news: Vec<NewsItem>,
    /// Total number of articles on the server.
    pub total_count: i64,
}

/// One article as sent by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    /// Article ID.
    pub id: i64,
    /// Headline.
    pub title: String,
    /// Short description.
    pub description: String,
    /// UTC timestamp without zone, e.g. `2025-04-18T12:00:00`.
    pub published_date: String,
    /// Relative article path.
    pub url: String,
    /// Absolute article link.
    pub full_url: String,
    /// Title image link; missing or empty when there is none.
    #[serde(default)]
    pub title_image_url: Option<String>,
    /// Category name.
    pub category_type: String,
}

impl NewsItem {
    /// Maps the wire item to the domain entity.
    ///
    /// # Errors
    /// Returns a mapping error for an unparsable date or article link.
    pub fn into_news(self) -> Result<News, NewsError> {
        let published_date = NaiveDateTime::parse_from_str(&self.published_date, PUBLISHED_DATE_FORMAT)
            .map_err(|e| NewsError::mapping(self.id, format!("bad publishedDate: {e}")))?
            .and_utc();

        let full_url = Url::parse(&self.full_url)
            .map_err(|e| NewsError::mapping(self.id, format!("bad fullUrl: {e}")))?;

        let image_url = self
            .title_image_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| Url::parse(s).ok());

        Ok(News {
            id: self.id,
            title: self.title,
            description: self.description,
            published_date,
            full_url,
            image_url,
            category: self.category_type,
        })
    }
}
