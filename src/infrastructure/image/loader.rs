//! Async image loading orchestrator.
//!
//! Cache -> in-flight request -> network. Concurrent loads of the same key share
//! one spawned pipeline; the pipeline always runs to completion and warms the
//! cache even when every caller has given up.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures_util::FutureExt;
use futures_util::future::Shared;
use parking_lot::Mutex;
use reqwest::Url;
use tokio::sync::{Semaphore, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::domain::entities::{Bitmap, CacheKey, ImageSource, LoadedImage};
use crate::domain::errors::{LoadError, NetworkError};
use crate::domain::ports::{
    ByteFetcherPort, CacheError, CacheResult, DisplayScalePort, ImageCachePort, ImageDecoderPort,
};

/// Configuration for the image loader.
#[derive(Debug, Clone)]
pub struct ImageLoaderConfig {
    /// Maximum pipelines downloading at the same time.
    pub max_concurrent_downloads: usize,
}

impl Default for ImageLoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 4,
        }
    }
}

type PipelineResult = Result<Bitmap, LoadError>;
type LoadChannel = Shared<oneshot::Receiver<PipelineResult>>;

/// One running fetch+decode pipeline, shared by every caller of its key.
struct InFlightRequest {
    id: u64,
    channel: LoadChannel,
    /// Callers that ever joined. Never decreases when one gives up.
    joined: usize,
}

type Registry = Arc<Mutex<HashMap<CacheKey, InFlightRequest>>>;

/// Removes the registry entry of a pipeline when the pipeline task ends,
/// however it ends.
struct RegistryGuard {
    registry: Registry,
    key: CacheKey,
    id: u64,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        let mut in_flight = self.registry.lock();
        if in_flight.get(&self.key).is_some_and(|r| r.id == self.id) {
            in_flight.remove(&self.key);
            trace!(key = %self.key, "Removed in-flight image request");
        }
    }
}

/// Everything a pipeline task needs, cheap to clone into it.
#[derive(Clone)]
struct Pipeline {
    fetcher: Arc<dyn ByteFetcherPort>,
    decoder: Arc<dyn ImageDecoderPort>,
    cache: Arc<dyn ImageCachePort>,
    display: Arc<dyn DisplayScalePort>,
    download_permits: Arc<Semaphore>,
}

impl Pipeline {
    /// Decodes the cached entry for `key`. Undecodable entries are dropped.
    async fn cached(&self, key: &CacheKey) -> Option<Bitmap> {
        let bytes = self.cache.get(key).await?;
        match self.decoder.decode(bytes).await {
            Ok(bitmap) => Some(bitmap),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached image is unreadable, refetching");
                if let Err(e) = self.cache.remove(key).await {
                    warn!(key = %key, error = %e, "Failed to drop unreadable cache entry");
                }
                None
            }
        }
    }

    async fn run(&self, key: &CacheKey, url: &Url) -> PipelineResult {
        let _permit = self
            .download_permits
            .acquire()
            .await
            .map_err(|_| LoadError::Cancelled)?;

        // A pipeline for this key may have finished between our caller's cache
        // miss and the registry insert.
        if let Some(bitmap) = self.cached(key).await {
            return Ok(bitmap);
        }

        debug!(key = %key, url = %url, "Downloading image from network");
        let bytes = self.fetcher.fetch(url).await?;

        let max_dimension = self.display.max_dimension();
        let bitmap = self.decoder.downsample(bytes, max_dimension).await?;

        match self.decoder.encode(&bitmap).await {
            Ok(encoded) => {
                if let Err(e) = self.cache.put(key, encoded).await {
                    warn!(key = %key, error = %e, "Failed to cache image");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Failed to encode image for cache"),
        }

        debug!(
            key = %key,
            width = bitmap.width(),
            height = bitmap.height(),
            "Image loaded successfully"
        );
        Ok(bitmap)
    }
}

/// Loads images through the cache, sharing concurrent requests for the same key.
#[derive(Clone)]
pub struct ImageLoader {
    pipeline: Pipeline,
    in_flight: Registry,
    next_id: Arc<AtomicU64>,
    config: ImageLoaderConfig,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight_count())
            .finish_non_exhaustive()
    }
}

impl ImageLoader {
    /// Creates a loader from its collaborators.
    #[must_use]
    pub fn new(
        config: ImageLoaderConfig,
        fetcher: Arc<dyn ByteFetcherPort>,
        decoder: Arc<dyn ImageDecoderPort>,
        cache: Arc<dyn ImageCachePort>,
        display: Arc<dyn DisplayScalePort>,
    ) -> Self {
        let download_permits = Arc::new(Semaphore::new(config.max_concurrent_downloads.max(1)));
        Self {
            pipeline: Pipeline {
                fetcher,
                decoder,
                cache,
                display,
                download_permits,
            },
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
            config,
        }
    }

    /// Loads the image at `url`.
    ///
    /// Dropping the returned future only detaches this caller; a started
    /// pipeline still finishes and fills the cache.
    ///
    /// # Errors
    /// Returns the network or decode failure of the pipeline, shared by every
    /// caller that joined it.
    pub async fn load(&self, url: &str) -> Result<LoadedImage, LoadError> {
        let url = Url::parse(url).map_err(|_| NetworkError::invalid_url(url))?;
        self.load_url(url).await
    }

    /// Like [`Self::load`] for an already parsed URL.
    ///
    /// # Errors
    /// See [`Self::load`].
    pub async fn load_url(&self, url: Url) -> Result<LoadedImage, LoadError> {
        let key = CacheKey::derive(&url);

        if let Some(bitmap) = self.pipeline.cached(&key).await {
            trace!(key = %key, "Served image from cache");
            return Ok(LoadedImage {
                key,
                bitmap,
                source: ImageSource::Cache,
            });
        }

        let channel = self.join_or_start(&key, url);
        let bitmap = channel.await.map_err(|_| LoadError::Cancelled)??;

        Ok(LoadedImage {
            key,
            bitmap,
            source: ImageSource::Network,
        })
    }

    /// Starts loading `url` on its own task and returns a cancellable handle.
    #[must_use]
    pub fn load_detached(&self, url: impl Into<String>) -> LoadHandle {
        let loader = self.clone();
        let url = url.into();
        LoadHandle {
            task: tokio::spawn(async move { loader.load(&url).await }),
        }
    }

    /// Attaches to the running pipeline for `key` or starts one.
    /// Lookup and insert happen under one lock.
    fn join_or_start(&self, key: &CacheKey, url: Url) -> LoadChannel {
        let mut in_flight = self.in_flight.lock();

        if let Some(request) = in_flight.get_mut(key) {
            request.joined += 1;
            debug!(key = %key, joined = request.joined, "Joined in-flight image request");
            return request.channel.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let channel = self.spawn_pipeline(key.clone(), url, id);
        in_flight.insert(
            key.clone(),
            InFlightRequest {
                id,
                channel: channel.clone(),
                joined: 1,
            },
        );
        channel
    }

    fn spawn_pipeline(&self, key: CacheKey, url: Url, id: u64) -> LoadChannel {
        let (sender, receiver) = oneshot::channel();
        let guard = RegistryGuard {
            registry: self.in_flight.clone(),
            key: key.clone(),
            id,
        };
        let pipeline = self.pipeline.clone();

        tokio::spawn(async move {
            let result = pipeline.run(&key, &url).await;
            // Leave the registry before publishing, so late callers either get
            // this result or start afresh.
            drop(guard);
            if sender.send(result).is_err() {
                trace!(key = %key, "No callers left, result only warmed the cache");
            }
        });

        receiver.shared()
    }

    /// Number of pipelines currently running.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Number of callers that joined the running pipeline for `key` since it
    /// started. Cancelled callers are still counted; 0 once the pipeline ends.
    #[must_use]
    pub fn joined_count(&self, key: &CacheKey) -> usize {
        self.in_flight.lock().get(key).map_or(0, |r| r.joined)
    }

    /// Returns true if a pipeline is running for the key of `url`.
    #[must_use]
    pub fn is_loading(&self, url: &str) -> bool {
        Url::parse(url).is_ok_and(|url| self.in_flight.lock().contains_key(&CacheKey::derive(&url)))
    }

    /// Removes the cached image for `url` from both tiers.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the disk entry cannot be removed.
    pub async fn remove_cached(&self, url: &str) -> CacheResult<()> {
        let url =
            Url::parse(url).map_err(|e| CacheError::IoError(format!("invalid URL {url}: {e}")))?;
        self.pipeline.cache.remove(&CacheKey::derive(&url)).await
    }

    /// Clears the cache.
    ///
    /// # Errors
    /// Returns error if the disk tier cannot be cleared.
    pub async fn clear_cache(&self) -> CacheResult<()> {
        self.pipeline.cache.clear().await
    }
}

/// A load running on its own task.
///
/// Await it for the result. Dropping the handle does not stop the load, call
/// [`LoadHandle::cancel`] for that.
#[derive(Debug)]
pub struct LoadHandle {
    task: JoinHandle<Result<LoadedImage, LoadError>>,
}

impl LoadHandle {
    /// Detaches from the load. Idempotent, and a no-op once finished.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Returns true once the load has settled or been cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Future for LoadHandle {
    type Output = Result<LoadedImage, LoadError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(e) => {
                if e.is_panic() {
                    warn!(error = %e, "Image load task panicked");
                }
                Err(LoadError::Cancelled)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bytes::Bytes;

    use crate::domain::errors::DecodeError;
    use crate::domain::ports::mocks::{
        CountingDecoder, MockByteFetcherPort, MockImageCache, ScriptedFetcher,
    };
    use crate::infrastructure::display::FixedDisplayScale;
    use crate::infrastructure::image::downsampler::ImageDownsampler;
    use crate::infrastructure::image::downsampler::tests::png_bytes;

    const URL: &str = "https://img.example.com/news/1/title.png";

    struct Harness {
        loader: ImageLoader,
        decoder: Arc<CountingDecoder<ImageDownsampler>>,
        cache: Arc<MockImageCache>,
    }

    fn harness(fetcher: Arc<dyn ByteFetcherPort>, max_dimension: u32) -> Harness {
        let decoder = Arc::new(CountingDecoder::new(ImageDownsampler::default()));
        let cache = Arc::new(MockImageCache::new());
        let loader = ImageLoader::new(
            ImageLoaderConfig::default(),
            fetcher,
            decoder.clone(),
            cache.clone(),
            Arc::new(FixedDisplayScale::pixels(max_dimension)),
        );
        Harness {
            loader,
            decoder,
            cache,
        }
    }

    fn key(url: &str) -> CacheKey {
        CacheKey::derive(&Url::parse(url).unwrap())
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_network_then_cache() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond(URL, Ok(png_bytes(300, 150)));
        let h = harness(fetcher.clone(), 100);

        let first = h.loader.load(URL).await.unwrap();
        assert_eq!(first.source, ImageSource::Network);
        assert_eq!((first.bitmap.width(), first.bitmap.height()), (100, 50));
        assert!(h.cache.contains(&key(URL)));

        let second = h.loader.load(URL).await.unwrap();
        assert_eq!(second.source, ImageSource::Cache);
        assert_eq!((second.bitmap.width(), second.bitmap.height()), (100, 50));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(h.decoder.downsamples(), 1);
    }

    #[tokio::test]
    async fn test_colliding_urls_share_cache_entry() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond(URL, Ok(png_bytes(10, 10)));
        let h = harness(fetcher.clone(), 100);

        h.loader.load(URL).await.unwrap();
        let other = h
            .loader
            .load("https://mirror.example.org/archive/1/title.png?v=2")
            .await
            .unwrap();

        assert_eq!(other.source, ImageSource::Cache);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_pipeline() {
        let (fetcher, gate) = ScriptedFetcher::gated();
        let fetcher = Arc::new(fetcher);
        fetcher.respond(URL, Ok(png_bytes(64, 64)));
        let h = harness(fetcher.clone(), 32);

        let handles: Vec<_> = (0..8).map(|_| h.loader.load_detached(URL)).collect();
        wait_until(|| h.loader.joined_count(&key(URL)) == 8).await;
        assert_eq!(h.loader.in_flight_count(), 1);

        gate.add_permits(1);
        let results = futures_util::future::join_all(handles).await;

        let first = results[0].as_ref().unwrap();
        for result in &results {
            let loaded = result.as_ref().unwrap();
            assert!(loaded.bitmap.ptr_eq(&first.bitmap));
        }
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(h.decoder.downsamples(), 1);
        assert_eq!(h.loader.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_error() {
        let (fetcher, gate) = ScriptedFetcher::gated();
        let fetcher = Arc::new(fetcher);
        fetcher.respond(URL, Err(NetworkError::ServerError { status: 503 }));
        let h = harness(fetcher.clone(), 32);

        let handles: Vec<_> = (0..4).map(|_| h.loader.load_detached(URL)).collect();
        wait_until(|| h.loader.joined_count(&key(URL)) == 4).await;

        gate.add_permits(1);
        for result in futures_util::future::join_all(handles).await {
            assert_eq!(
                result.unwrap_err(),
                LoadError::Network(NetworkError::ServerError { status: 503 })
            );
        }
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(h.loader.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_request_leaves_registry_and_retries_fresh() {
        let mut fetcher = MockByteFetcherPort::new();
        fetcher
            .expect_fetch()
            .times(2)
            .returning(|_| Err(NetworkError::ServerError { status: 500 }));
        let h = harness(Arc::new(fetcher), 32);

        let first = h.loader.load(URL).await;
        assert!(matches!(first, Err(LoadError::Network(_))));
        assert!(!h.loader.is_loading(URL));
        assert_eq!(h.loader.in_flight_count(), 0);

        let second = h.loader.load(URL).await;
        assert!(matches!(second, Err(LoadError::Network(_))));
    }

    #[tokio::test]
    async fn test_invalid_url_is_network_error() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let h = harness(fetcher.clone(), 32);

        let result = h.loader.load("not a url").await;

        assert!(matches!(
            result,
            Err(LoadError::Network(NetworkError::InvalidUrl { .. }))
        ));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_decode_failure_does_not_populate_cache() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond(URL, Ok(Bytes::from_static(b"<html>not found</html>")));
        let h = harness(fetcher, 32);

        let result = h.loader.load(URL).await;

        assert!(matches!(
            result,
            Err(LoadError::Decode(DecodeError::InvalidData { .. }))
        ));
        assert!(!h.cache.contains(&key(URL)));
        assert_eq!(h.loader.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_returns_image() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond(URL, Ok(png_bytes(16, 16)));
        let h = harness(fetcher, 32);
        h.cache.set_fail_writes(true);

        let loaded = tokio_test::assert_ok!(h.loader.load(URL).await);

        assert_eq!(loaded.source, ImageSource::Network);
        assert!(!h.cache.contains(&key(URL)));
    }

    #[tokio::test]
    async fn test_unreadable_cache_entry_is_refetched() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond(URL, Ok(png_bytes(16, 16)));
        let h = harness(fetcher.clone(), 32);
        h.cache.insert(key(URL), Bytes::from_static(b"corrupt"));

        let loaded = h.loader.load(URL).await.unwrap();

        assert_eq!(loaded.source, ImageSource::Network);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_one_caller_keeps_others() {
        let (fetcher, gate) = ScriptedFetcher::gated();
        let fetcher = Arc::new(fetcher);
        fetcher.respond(URL, Ok(png_bytes(16, 16)));
        let h = harness(fetcher.clone(), 32);

        let cancelled = h.loader.load_detached(URL);
        let kept = h.loader.load_detached(URL);
        wait_until(|| h.loader.joined_count(&key(URL)) == 2).await;

        cancelled.cancel();
        cancelled.cancel();
        assert_eq!(cancelled.await.unwrap_err(), LoadError::Cancelled);
        // Cancelling detaches the caller without un-joining it.
        assert_eq!(h.loader.joined_count(&key(URL)), 2);

        gate.add_permits(1);
        let loaded = kept.await.unwrap();
        assert_eq!(loaded.source, ImageSource::Network);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_load_still_warms_cache() {
        let (fetcher, gate) = ScriptedFetcher::gated();
        let fetcher = Arc::new(fetcher);
        fetcher.respond(URL, Ok(png_bytes(16, 16)));
        let h = harness(fetcher.clone(), 32);

        let handle = h.loader.load_detached(URL);
        wait_until(|| h.loader.joined_count(&key(URL)) == 1).await;
        handle.cancel();
        assert!(handle.await.unwrap_err().is_cancelled());

        gate.add_permits(1);
        wait_until(|| h.loader.in_flight_count() == 0).await;
        assert!(h.cache.contains(&key(URL)));

        let loaded = h.loader.load(URL).await.unwrap();
        assert_eq!(loaded.source, ImageSource::Cache);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_noop() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond(URL, Ok(png_bytes(8, 8)));
        let h = harness(fetcher, 32);

        let handle = h.loader.load_detached(URL);
        wait_until(|| handle.is_finished()).await;
        handle.cancel();
        handle.cancel();

        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond(URL, Ok(png_bytes(8, 8)));
        let h = harness(fetcher.clone(), 32);

        h.loader.load(URL).await.unwrap();
        h.loader.clear_cache().await.unwrap();
        let loaded = h.loader.load(URL).await.unwrap();

        assert_eq!(loaded.source, ImageSource::Network);
        assert_eq!(fetcher.calls(), 2);

        h.loader.remove_cached(URL).await.unwrap();
        assert!(!h.cache.contains(&key(URL)));
    }
}
