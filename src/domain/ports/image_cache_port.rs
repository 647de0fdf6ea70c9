//! Port definition for image caching.

use bytes::Bytes;

use crate::domain::entities::CacheKey;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors that can occur during cache operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// I/O error on the disk tier.
    #[error("IO error: {0}")]
    IoError(String),
}

/// Port for storing encoded image bytes.
/// Implementations must be thread-safe.
#[async_trait::async_trait]
pub trait ImageCachePort: Send + Sync {
    /// Returns the bytes stored under `key`, or None if not cached.
    async fn get(&self, key: &CacheKey) -> Option<Bytes>;

    /// Stores bytes under `key`.
    ///
    /// # Errors
    /// Returns error if the bytes could not be persisted.
    async fn put(&self, key: &CacheKey, bytes: Bytes) -> CacheResult<()>;

    /// Removes an entry.
    ///
    /// # Errors
    /// Returns error if the persisted entry could not be deleted.
    async fn remove(&self, key: &CacheKey) -> CacheResult<()>;

    /// Drops every entry.
    ///
    /// # Errors
    /// Returns error if persisted entries could not be deleted.
    async fn clear(&self) -> CacheResult<()>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    use parking_lot::Mutex;

    /// In-memory cache whose writes can be made to fail.
    #[derive(Default)]
    pub struct MockImageCache {
        entries: Mutex<HashMap<CacheKey, Bytes>>,
        fail_writes: AtomicBool,
    }

    impl MockImageCache {
        /// Creates an empty mock.
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every subsequent `put` fail after storing nothing.
        pub fn set_fail_writes(&self, value: bool) {
            self.fail_writes.store(value, Ordering::SeqCst);
        }

        /// Inserts raw bytes directly.
        pub fn insert(&self, key: CacheKey, bytes: impl Into<Bytes>) {
            self.entries.lock().insert(key, bytes.into());
        }

        /// Returns true if an entry exists.
        pub fn contains(&self, key: &CacheKey) -> bool {
            self.entries.lock().contains_key(key)
        }
    }

    #[async_trait::async_trait]
    impl ImageCachePort for MockImageCache {
        async fn get(&self, key: &CacheKey) -> Option<Bytes> {
            self.entries.lock().get(key).cloned()
        }

        async fn put(&self, key: &CacheKey, bytes: Bytes) -> CacheResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(CacheError::IoError("mock disk full".to_string()));
            }
            self.entries.lock().insert(key.clone(), bytes);
            Ok(())
        }

        async fn remove(&self, key: &CacheKey) -> CacheResult<()> {
            self.entries.lock().remove(key);
            Ok(())
        }

        async fn clear(&self) -> CacheResult<()> {
            self.entries.lock().clear();
            Ok(())
        }
    }
}
