//! Paged news feed state.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::entities::{News, NewsId};
use crate::domain::errors::NewsError;
use crate::domain::ports::NewsPort;

/// Default number of articles per page.
pub const DEFAULT_ITEMS_PER_PAGE: u32 = 15;

/// How close to the end of the list a visible row triggers the next page.
const LOAD_MORE_THRESHOLD: usize = 5;

#[derive(Debug, Default)]
struct PagerState {
    items: Vec<News>,
    seen: HashSet<NewsId>,
    next_page: u32,
    can_load_more: bool,
}

/// Accumulates news pages for an infinite list.
///
/// Offset paging over a changing feed can return an article twice; each id
/// is kept only the first time it is seen.
///
/// Only one page loads at a time; a second request while one is running
/// fails with [`NewsError::Busy`].
pub struct NewsPager {
    source: Arc<dyn NewsPort>,
    items_per_page: u32,
    state: Mutex<PagerState>,
    loading: AtomicBool,
}

impl PagerState {
    /// Appends articles not seen before and returns them.
    fn append_unique(&mut self, page: Vec<News>) -> Vec<News> {
        let received = page.len();
        let fresh: Vec<News> = page
            .into_iter()
            .filter(|news| self.seen.insert(news.id))
            .collect();
        if fresh.len() < received {
            debug!(
                skipped = received - fresh.len(),
                "Skipped repeated news articles"
            );
        }
        self.items.extend(fresh.iter().cloned());
        fresh
    }
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, NewsError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| NewsError::Busy)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl NewsPager {
    /// Creates a pager. Zero `items_per_page` falls back to the default.
    #[must_use]
    pub fn new(source: Arc<dyn NewsPort>, items_per_page: u32) -> Self {
        let items_per_page = if items_per_page == 0 {
            DEFAULT_ITEMS_PER_PAGE
        } else {
            items_per_page
        };
        Self {
            source,
            items_per_page,
            state: Mutex::new(PagerState {
                items: Vec::new(),
                seen: HashSet::new(),
                next_page: 1,
                can_load_more: true,
            }),
            loading: AtomicBool::new(false),
        }
    }

    /// Loads page 1, replacing everything loaded so far.
    ///
    /// # Errors
    /// Returns [`NewsError::Busy`] if a page is already loading, or the fetch error.
    /// On error the current items are kept.
    pub async fn load_first(&self) -> Result<Vec<News>, NewsError> {
        let _loading = LoadingGuard::acquire(&self.loading)?;
        let page = self.fetch(1).await?;

        let mut state = self.state.lock();
        state.items.clear();
        state.seen.clear();
        state.next_page = 2;
        state.can_load_more = self.is_full(&page);
        Ok(state.append_unique(page))
    }

    /// Loads the next page and appends it. Returns the new items, empty when
    /// the feed is exhausted.
    ///
    /// # Errors
    /// Returns [`NewsError::Busy`] if a page is already loading, or the fetch error.
    pub async fn load_more(&self) -> Result<Vec<News>, NewsError> {
        let _loading = LoadingGuard::acquire(&self.loading)?;
        let page_number = {
            let state = self.state.lock();
            if !state.can_load_more {
                return Ok(Vec::new());
            }
            state.next_page
        };

        let page = self.fetch(page_number).await?;

        let mut state = self.state.lock();
        state.next_page = page_number + 1;
        state.can_load_more = self.is_full(&page);
        Ok(state.append_unique(page))
    }

    async fn fetch(&self, page: u32) -> Result<Vec<News>, NewsError> {
        match self.source.fetch_news(page, self.items_per_page).await {
            Ok(items) => {
                debug!(page, count = items.len(), "Loaded news page");
                Ok(items)
            }
            Err(e) => {
                warn!(page, error = %e, "Failed to load news page");
                Err(e)
            }
        }
    }

    fn is_full(&self, page: &[News]) -> bool {
        page.len() == self.items_per_page as usize
    }

    /// Returns true when showing row `index` should trigger [`Self::load_more`].
    #[must_use]
    pub fn should_load_more(&self, index: usize) -> bool {
        if self.is_loading() {
            return false;
        }
        let state = self.state.lock();
        state.can_load_more
            && !state.items.is_empty()
            && index >= state.items.len().saturating_sub(LOAD_MORE_THRESHOLD)
    }

    /// All loaded articles, in feed order.
    #[must_use]
    pub fn items(&self) -> Vec<News> {
        self.state.lock().items.clone()
    }

    /// Number of loaded articles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Returns true if nothing is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true unless the last page came back short.
    #[must_use]
    pub fn can_load_more(&self) -> bool {
        self.state.lock().can_load_more
    }

    /// Returns true while a page is loading.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Articles per page.
    #[must_use]
    pub const fn items_per_page(&self) -> u32 {
        self.items_per_page
    }
}
