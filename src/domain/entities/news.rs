//! News article entity.

use chrono::{DateTime, Utc};
use reqwest::Url;

/// Identifier of a news article.
pub type NewsId = i64;

/// A news article as shown in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct News {
    /// Article ID.
    pub id: NewsId,
    /// Headline.
    pub title: String,
    /// Short description shown in the list.
    pub description: String,
    /// Publication time.
    pub published_date: DateTime<Utc>,
    /// Link to the full article.
    pub full_url: Url,
    /// Title image, if the article has a usable one.
    pub image_url: Option<Url>,
    /// Category name.
    pub category: String,
}

impl News {
    /// Returns true if the article has a title image.
    #[must_use]
    pub const fn has_image(&self) -> bool {
        self.image_url.is_some()
    }
}
