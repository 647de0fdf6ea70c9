//! Port for fetching news pages.

use async_trait::async_trait;

use crate::domain::entities::News;
use crate::domain::errors::NewsError;

/// Source of paged news.
#[async_trait]
pub trait NewsPort: Send + Sync {
    /// Fetches one page. Pages are 1-based.
    async fn fetch_news(&self, page: u32, items_per_page: u32) -> Result<Vec<News>, NewsError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;
    use parking_lot::Mutex;
    use reqwest::Url;

    /// Serves `total` generated articles, paged.
    pub struct MockNewsPort {
        total: usize,
        fail: Mutex<Option<NewsError>>,
        calls: AtomicUsize,
    }

    impl MockNewsPort {
        /// Creates a source with `total` articles.
        pub fn new(total: usize) -> Self {
            Self {
                total,
                fail: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }

        /// Makes the next fetch fail.
        pub fn fail_next(&self, error: NewsError) {
            *self.fail.lock() = Some(error);
        }

        /// Number of fetches.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Builds the article with the given id.
        pub fn article(id: i64) -> News {
            News {
                id,
                title: format!("News {id}"),
                description: String::new(),
                published_date: chrono::Utc.with_ymd_and_hms(2025, 4, 18, 12, 0, 0).unwrap(),
                full_url: Url::parse(&format!("https://example.com/news/{id}")).unwrap(),
                image_url: Some(
                    Url::parse(&format!("https://img.example.com/news/{id}/title.png")).unwrap(),
                ),
                category: "Auto".to_string(),
            }
        }
    }

    #[async_trait]
    impl NewsPort for MockNewsPort {
        async fn fetch_news(
            &self,
            page: u32,
            items_per_page: u32,
        ) -> Result<Vec<News>, NewsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.fail.lock().take() {
                return Err(error);
            }
            let start = (page.saturating_sub(1) * items_per_page) as usize;
            let end = (start + items_per_page as usize).min(self.total);
            Ok((start..end).map(|i| Self::article(i as i64 + 1)).collect())
        }
    }
}
