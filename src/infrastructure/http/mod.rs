//! HTTP clients for images and the news API.

mod dto;
mod fetcher;
mod news_client;

pub use dto::{NewsItem, NewsResponse};
pub use fetcher::{DEFAULT_TIMEOUT_SECS, ReqwestByteFetcher};
pub use news_client::{DEFAULT_NEWS_BASE_URL, NewsClient};

const USER_AGENT: &str = concat!("newsfeed/", env!("CARGO_PKG_VERSION"));
