//! Warms the image cache for feed items that are about to scroll into view.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::domain::entities::{News, NewsId};

use super::loader::{ImageLoader, LoadHandle};

/// Starts one detached load per article image and lets callers drop interest
/// again by article id.
///
/// Cancelling only detaches; the shared pipeline still fills the cache.
#[derive(Debug)]
pub struct ImagePrefetcher {
    loader: ImageLoader,
    tasks: Mutex<HashMap<NewsId, LoadHandle>>,
}

impl ImagePrefetcher {
    /// Creates a prefetcher on top of `loader`.
    #[must_use]
    pub fn new(loader: ImageLoader) -> Self {
        Self {
            loader,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Starts loading the title image of every item that has one and is not
    /// already being prefetched. Returns how many loads were started.
    pub fn prefetch<'a>(&self, items: impl IntoIterator<Item = &'a News>) -> usize {
        let mut tasks = self.tasks.lock();
        tasks.retain(|_, handle| !handle.is_finished());

        let mut started = 0;
        for item in items {
            let Some(url) = &item.image_url else {
                continue;
            };
            if tasks.contains_key(&item.id) {
                continue;
            }
            tasks.insert(item.id, self.loader.load_detached(url.as_str()));
            started += 1;
        }

        if started > 0 {
            debug!(started, active = tasks.len(), "Prefetching images");
        }
        started
    }

    /// Drops interest in the images of the given articles.
    pub fn cancel_prefetching(&self, ids: impl IntoIterator<Item = NewsId>) {
        let mut tasks = self.tasks.lock();
        for id in ids {
            if let Some(handle) = tasks.remove(&id) {
                handle.cancel();
            }
        }
    }

    /// Number of prefetches not yet finished.
    #[must_use]
    pub fn active_count(&self) -> usize {
        let mut tasks = self.tasks.lock();
        tasks.retain(|_, handle| !handle.is_finished());
        tasks.len()
    }

    /// Waits for every running prefetch, discarding results.
    pub async fn wait_idle(&self) {
        let handles: Vec<LoadHandle> = self.tasks.lock().drain().map(|(_, h)| h).collect();
        futures_util::future::join_all(handles).await;
    }
}

impl Drop for ImagePrefetcher {
    fn drop(&mut self) {
        for handle in self.tasks.get_mut().values() {
            handle.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use reqwest::Url;

    use crate::domain::entities::CacheKey;
    use crate::domain::ports::mocks::{MockImageCache, MockNewsPort, ScriptedFetcher};
    use crate::infrastructure::display::FixedDisplayScale;
    use crate::infrastructure::image::downsampler::ImageDownsampler;
    use crate::infrastructure::image::downsampler::tests::png_bytes;
    use crate::infrastructure::image::loader::ImageLoaderConfig;

    fn loader(fetcher: Arc<ScriptedFetcher>, cache: Arc<MockImageCache>) -> ImageLoader {
        ImageLoader::new(
            ImageLoaderConfig::default(),
            fetcher,
            Arc::new(ImageDownsampler::default()),
            cache,
            Arc::new(FixedDisplayScale::pixels(64)),
        )
    }

    fn key_of(news: &News) -> CacheKey {
        CacheKey::derive(news.image_url.as_ref().unwrap())
    }

    #[tokio::test]
    async fn test_prefetch_warms_cache() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let items: Vec<News> = (1..=3).map(MockNewsPort::article).collect();
        for item in &items {
            fetcher.respond(item.image_url.as_ref().unwrap().as_str(), Ok(png_bytes(20, 20)));
        }
        let cache = Arc::new(MockImageCache::new());
        let prefetcher = ImagePrefetcher::new(loader(fetcher.clone(), cache.clone()));

        assert_eq!(prefetcher.prefetch(&items), 3);
        prefetcher.wait_idle().await;

        for item in &items {
            assert!(cache.contains(&key_of(item)));
        }
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_prefetch_skips_running_and_imageless_items() {
        let (fetcher, gate) = ScriptedFetcher::gated();
        let fetcher = Arc::new(fetcher);
        let mut items: Vec<News> = (1..=2).map(MockNewsPort::article).collect();
        items[1].image_url = None;
        let prefetcher =
            ImagePrefetcher::new(loader(fetcher.clone(), Arc::new(MockImageCache::new())));

        assert_eq!(prefetcher.prefetch(&items), 1);
        assert_eq!(prefetcher.prefetch(&items), 0);
        assert_eq!(prefetcher.active_count(), 1);

        gate.add_permits(1);
        prefetcher.wait_idle().await;
        assert_eq!(prefetcher.active_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_prefetch_still_warms_cache() {
        let (fetcher, gate) = ScriptedFetcher::gated();
        let fetcher = Arc::new(fetcher);
        let item = MockNewsPort::article(7);
        let url = item.image_url.clone().unwrap();
        fetcher.respond(url.as_str(), Ok(png_bytes(20, 20)));
        let cache = Arc::new(MockImageCache::new());
        let image_loader = loader(fetcher.clone(), cache.clone());
        let prefetcher = ImagePrefetcher::new(image_loader.clone());

        prefetcher.prefetch([&item]);
        tokio::time::timeout(Duration::from_secs(5), async {
            while !image_loader.is_loading(url.as_str()) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();

        prefetcher.cancel_prefetching([7]);
        assert_eq!(prefetcher.active_count(), 0);
        // Cancelling again is harmless.
        prefetcher.cancel_prefetching([7]);

        gate.add_permits(1);
        tokio::time::timeout(Duration::from_secs(5), async {
            while !cache.contains(&key_of(&item)) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_shared_image_fetched_once() {
        let (fetcher, gate) = ScriptedFetcher::gated();
        let fetcher = Arc::new(fetcher);
        let mut items: Vec<News> = (1..=2).map(MockNewsPort::article).collect();
        let shared = Url::parse("https://img.example.com/shared/banner.png").unwrap();
        for item in &mut items {
            item.image_url = Some(shared.clone());
        }
        fetcher.respond(shared.as_str(), Ok(png_bytes(20, 20)));
        let prefetcher =
            ImagePrefetcher::new(loader(fetcher.clone(), Arc::new(MockImageCache::new())));

        assert_eq!(prefetcher.prefetch(&items), 2);
        gate.add_permits(1);
        prefetcher.wait_idle().await;

        assert_eq!(fetcher.calls(), 1);
    }
}
