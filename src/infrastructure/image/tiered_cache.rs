//! Two-tier image cache: bounded memory in front of an unbounded disk directory.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::entities::CacheKey;
use crate::domain::ports::{CacheResult, ImageCachePort};

use super::disk_cache::{DiskImageCache, DiskUsage};
use super::memory_cache::{CacheStats, MemoryImageCache};

/// Limits for the memory tier.
#[derive(Debug, Clone, Copy)]
pub struct MemoryLimits {
    /// Maximum number of entries.
    pub count: usize,
    /// Maximum total size in bytes.
    pub size: usize,
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self {
            count: super::memory_cache::DEFAULT_COUNT_LIMIT,
            size: super::memory_cache::DEFAULT_SIZE_LIMIT,
        }
    }
}

/// Cache for encoded images. Reads fall through memory to disk, writes fill both.
///
/// `clear` takes the directory gate exclusively, every other operation takes it
/// shared, so no reader ever sees the directory half deleted.
pub struct TieredCache {
    memory: MemoryImageCache,
    disk: DiskImageCache,
    dir_gate: RwLock<()>,
    disk_hits: AtomicU64,
}

impl std::fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache")
            .field("dir", &self.disk.cache_dir())
            .field("memory_entries", &self.memory.len())
            .finish_non_exhaustive()
    }
}

impl TieredCache {
    /// Opens a cache rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub async fn new(dir: PathBuf, limits: MemoryLimits) -> CacheResult<Self> {
        let disk = DiskImageCache::new(dir).await?;
        Ok(Self {
            memory: MemoryImageCache::new(limits.count, limits.size),
            disk,
            dir_gate: RwLock::new(()),
            disk_hits: AtomicU64::new(0),
        })
    }

    /// Opens a cache in the platform cache directory.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub async fn default_location() -> CacheResult<Self> {
        Self::new(super::disk_cache::default_cache_dir(), MemoryLimits::default()).await
    }

    /// Returns memory tier and disk usage statistics.
    ///
    /// # Errors
    /// Returns error if the disk directory cannot be read.
    pub async fn stats(&self) -> CacheResult<TieredStats> {
        let _gate = self.dir_gate.read().await;
        Ok(TieredStats {
            memory: self.memory.stats(),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            disk: self.disk.usage().await?,
        })
    }

    /// Returns true if the memory tier currently holds `key`.
    #[must_use]
    pub fn in_memory(&self, key: &CacheKey) -> bool {
        self.memory.peek(key).is_some()
    }
}

#[async_trait::async_trait]
impl ImageCachePort for TieredCache {
    async fn get(&self, key: &CacheKey) -> Option<Bytes> {
        let _gate = self.dir_gate.read().await;

        if let Some(bytes) = self.memory.get(key) {
            return Some(bytes);
        }

        match self.disk.get(key).await {
            Ok(Some(bytes)) => {
                self.disk_hits.fetch_add(1, Ordering::Relaxed);
                self.memory.put(key.clone(), bytes.clone());
                debug!(key = %key, "Promoted disk entry to memory");
                Some(bytes)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Disk cache read failed, treating as miss");
                None
            }
        }
    }

    async fn put(&self, key: &CacheKey, bytes: Bytes) -> CacheResult<()> {
        let _gate = self.dir_gate.read().await;
        self.memory.put(key.clone(), bytes.clone());
        self.disk.put(key, &bytes).await
    }

    async fn remove(&self, key: &CacheKey) -> CacheResult<()> {
        let _gate = self.dir_gate.read().await;
        self.memory.evict(key);
        self.disk.remove(key).await
    }

    async fn clear(&self) -> CacheResult<()> {
        let _gate = self.dir_gate.write().await;
        self.memory.clear();
        self.disk.clear().await?;
        info!("Cleared all image caches");
        Ok(())
    }
}

/// Snapshot of cache statistics.
#[derive(Debug, Clone)]
pub struct TieredStats {
    /// Memory tier statistics.
    pub memory: CacheStats,
    /// Reads served by the disk tier.
    pub disk_hits: u64,
    /// Files on disk.
    pub disk: DiskUsage,
}

impl std::fmt::Display for TieredStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\nDisk: {} images ({} bytes), {} hits",
            self.memory, self.disk.files, self.disk.bytes, self.disk_hits
        )
    }
}
