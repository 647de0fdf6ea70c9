//! Disk tier for encoded image bytes, persisted across sessions.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

use crate::domain::entities::CacheKey;
use crate::domain::ports::{CacheError, CacheResult};

const ENTRY_EXTENSION: &str = "img";

/// Disk-based image cache storing one file per key.
///
/// Unbounded; callers that need to reclaim space call [`DiskImageCache::clear`].
/// Does no locking of its own, the owning tiered cache serializes `clear`.
#[derive(Debug)]
pub struct DiskImageCache {
    cache_dir: PathBuf,
    temp_counter: AtomicU64,
}

impl DiskImageCache {
    /// Creates a new disk cache in the specified directory, creating it if absent.
    ///
    /// # Errors
    /// Returns error if cache directory cannot be created.
    pub async fn new(cache_dir: PathBuf) -> CacheResult<Self> {
        fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to create cache dir: {e}")))?;

        debug!(path = %cache_dir.display(), "Opened disk image cache");

        Ok(Self {
            cache_dir,
            temp_counter: AtomicU64::new(0),
        })
    }

    /// Directory holding the cache files.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path for a cached image.
    fn cache_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{ENTRY_EXTENSION}", key.as_str()))
    }

    fn temp_path(&self, key: &CacheKey) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        self.cache_dir
            .join(format!(".{}.{}.{n}.tmp", key.as_str(), std::process::id()))
    }

    /// Reads the bytes stored under `key`.
    ///
    /// # Errors
    /// Returns error for I/O failures other than a missing file.
    pub async fn get(&self, key: &CacheKey) -> CacheResult<Option<Bytes>> {
        let path = self.cache_path(key);
        match fs::read(&path).await {
            Ok(bytes) => {
                trace!(key = %key, path = %path.display(), "Disk cache hit");
                Ok(Some(Bytes::from(bytes)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(key = %key, "Disk cache miss");
                Ok(None)
            }
            Err(e) => Err(CacheError::IoError(format!(
                "Failed to read cache file {}: {e}",
                path.display()
            ))),
        }
    }

    /// Stores bytes under `key`.
    ///
    /// Writes to a temporary file first and renames it into place, so readers
    /// see either the old or the new contents.
    ///
    /// # Errors
    /// Returns error if file cannot be created or written.
    pub async fn put(&self, key: &CacheKey, bytes: &[u8]) -> CacheResult<()> {
        let path = self.cache_path(key);
        let temp = self.temp_path(key);

        if let Err(e) = write_file(&temp, bytes).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(CacheError::IoError(format!(
                "Failed to move cache file into place: {e}"
            )));
        }

        debug!(key = %key, path = %path.display(), size = bytes.len(), "Stored image in disk cache");
        Ok(())
    }

    /// Removes an image from disk cache. A missing file is not an error.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be removed.
    pub async fn remove(&self, key: &CacheKey) -> CacheResult<()> {
        let path = self.cache_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key = %key, "Evicted from disk cache");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to evict from disk cache");
                Err(CacheError::IoError(format!("Failed to remove cache file: {e}")))
            }
        }
    }

    /// Deletes the cache directory and recreates it empty.
    ///
    /// # Errors
    /// Returns error if the directory cannot be removed or recreated.
    pub async fn clear(&self) -> CacheResult<()> {
        match fs::remove_dir_all(&self.cache_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CacheError::IoError(format!(
                    "Failed to remove cache dir: {e}"
                )));
            }
        }
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to recreate cache dir: {e}")))?;
        debug!(path = %self.cache_dir.display(), "Cleared disk cache");
        Ok(())
    }

    /// Checks if an image is cached.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        fs::try_exists(self.cache_path(key)).await.unwrap_or(false)
    }

    /// Counts cached files and their total size.
    ///
    /// # Errors
    /// Returns error if cache directory cannot be read.
    pub async fn usage(&self) -> CacheResult<DiskUsage> {
        let mut entries = fs::read_dir(&self.cache_dir)
            .await
            .map_err(|e| CacheError::IoError(format!("Failed to read cache dir: {e}")))?;

        let mut usage = DiskUsage::default();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION)
                && let Ok(meta) = entry.metadata().await
            {
                usage.files += 1;
                usage.bytes += meta.len();
            }
        }
        Ok(usage)
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> CacheResult<()> {
    let mut file = fs::File::create(path)
        .await
        .map_err(|e| CacheError::IoError(format!("Failed to create cache file: {e}")))?;

    file.write_all(bytes)
        .await
        .map_err(|e| CacheError::IoError(format!("Failed to write cache file: {e}")))?;

    file.flush()
        .await
        .map_err(|e| CacheError::IoError(format!("Failed to flush cache file: {e}")))
}

/// Number and total size of files in the disk tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskUsage {
    /// Number of cached files.
    pub files: usize,
    /// Total size in bytes.
    pub bytes: u64,
}

/// Returns the default cache directory path.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "linuxmobile", "newsfeed").map_or_else(
        || {
            std::env::temp_dir()
                .join("newsfeed")
                .join("cache")
                .join("images")
        },
        |dirs| dirs.cache_dir().join("images"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_cache() -> (DiskImageCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskImageCache::new(temp_dir.path().join("images"))
            .await
            .unwrap();
        (cache, temp_dir)
    }

    #[tokio::test]
    async fn test_new_creates_directory() {
        let (cache, _temp) = create_test_cache().await;
        assert!(cache.cache_dir().is_dir());
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (cache, _temp) = create_test_cache().await;
        let key = CacheKey::new("test1");
        let data = b"test image data";

        cache.put(&key, data).await.unwrap();
        let retrieved = cache.get(&key).await.unwrap();

        assert_eq!(retrieved.as_deref(), Some(&data[..]));
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let (cache, _temp) = create_test_cache().await;
        let result = cache.get(&CacheKey::new("nonexistent")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let (cache, _temp) = create_test_cache().await;
        let key = CacheKey::new("test1");

        cache.put(&key, b"first").await.unwrap();
        cache.put(&key, b"second").await.unwrap();

        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some(&b"second"[..]));
        let mut names = Vec::new();
        let mut entries = fs::read_dir(cache.cache_dir()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name());
        }
        assert_eq!(names, vec![std::ffi::OsString::from("test1.img")]);
    }

    #[tokio::test]
    async fn test_remove() {
        let (cache, _temp) = create_test_cache().await;
        let key = CacheKey::new("test1");

        cache.put(&key, b"test").await.unwrap();
        assert!(cache.contains(&key).await);

        cache.remove(&key).await.unwrap();
        assert!(!cache.contains(&key).await);

        // Removing again is fine.
        cache.remove(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_recreates_directory() {
        let (cache, _temp) = create_test_cache().await;

        cache.put(&CacheKey::new("test1"), b"data1").await.unwrap();
        cache.put(&CacheKey::new("test2"), b"data2").await.unwrap();
        assert_eq!(
            cache.usage().await.unwrap(),
            DiskUsage { files: 2, bytes: 10 }
        );

        cache.clear().await.unwrap();

        assert!(cache.cache_dir().is_dir());
        assert_eq!(cache.usage().await.unwrap(), DiskUsage::default());
        assert!(cache.get(&CacheKey::new("test1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_into_missing_directory_fails() {
        let (cache, _temp) = create_test_cache().await;
        fs::remove_dir_all(cache.cache_dir()).await.unwrap();

        let result = cache.put(&CacheKey::new("test1"), b"data").await;
        assert!(matches!(result, Err(CacheError::IoError(_))));
    }
}
