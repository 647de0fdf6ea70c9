//! Application layer with feed services.

/// Feed services.
pub mod services;

pub use services::news_pager::{DEFAULT_ITEMS_PER_PAGE, NewsPager};
