//! In-memory LRU tier for encoded image bytes.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::CacheKey;

/// Default maximum number of entries kept in memory.
pub const DEFAULT_COUNT_LIMIT: usize = 100;

/// Default maximum total size of entries kept in memory (100 MB).
pub const DEFAULT_SIZE_LIMIT: usize = 100 * 1024 * 1024;

struct MemoryTier {
    entries: LruCache<CacheKey, Bytes>,
    total_bytes: usize,
    size_limit: usize,
}

impl MemoryTier {
    fn forget(&mut self, evicted: Option<(CacheKey, Bytes)>) {
        if let Some((key, bytes)) = evicted {
            self.total_bytes -= bytes.len();
            trace!(key = %key, size = bytes.len(), "Dropped entry from memory tier");
        }
    }
}

/// Bounded LRU cache of encoded images.
///
/// Bounded both by entry count and by total byte size. This is a soft cache:
/// anything in here may disappear at any time.
pub struct MemoryImageCache {
    tier: Mutex<MemoryTier>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a new cache with the given limits.
    #[must_use]
    pub fn new(count_limit: usize, size_limit: usize) -> Self {
        let cap = NonZeroUsize::new(count_limit).unwrap_or(NonZeroUsize::MIN);
        Self {
            tier: Mutex::new(MemoryTier {
                entries: LruCache::new(cap),
                total_bytes: 0,
                size_limit,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a new cache with the default limits.
    #[must_use]
    pub fn with_default_limits() -> Self {
        Self::new(DEFAULT_COUNT_LIMIT, DEFAULT_SIZE_LIMIT)
    }

    /// Returns the bytes for `key` and marks them recently used.
    pub fn get(&self, key: &CacheKey) -> Option<Bytes> {
        let mut tier = self.tier.lock();
        if let Some(bytes) = tier.entries.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache hit");
            Some(bytes.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache miss");
            None
        }
    }

    /// Peeks at an entry without promoting it in the LRU.
    pub fn peek(&self, key: &CacheKey) -> Option<Bytes> {
        self.tier.lock().entries.peek(key).cloned()
    }

    /// Stores bytes, evicting least recently used entries to stay within limits.
    pub fn put(&self, key: CacheKey, bytes: Bytes) {
        let mut tier = self.tier.lock();

        if bytes.len() > tier.size_limit {
            let old = tier.entries.pop_entry(&key);
            tier.forget(old);
            debug!(key = %key, size = bytes.len(), "Entry larger than memory tier, not kept");
            return;
        }

        tier.total_bytes += bytes.len();
        let displaced = tier.entries.push(key, bytes);
        tier.forget(displaced);

        while tier.total_bytes > tier.size_limit {
            let Some(evicted) = tier.entries.pop_lru() else {
                break;
            };
            tier.forget(Some(evicted));
        }
    }

    /// Removes an entry.
    pub fn evict(&self, key: &CacheKey) {
        let mut tier = self.tier.lock();
        let old = tier.entries.pop_entry(key);
        if old.is_some() {
            debug!(key = %key, "Evicted image from memory cache");
        }
        tier.forget(old);
    }

    /// Drops all entries.
    pub fn clear(&self) {
        let mut tier = self.tier.lock();
        tier.entries.clear();
        tier.total_bytes = 0;
        debug!("Cleared memory image cache");
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tier.lock().entries.len()
    }

    /// Returns true if the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total size of the stored bytes.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.tier.lock().total_bytes
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let tier = self.tier.lock();
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: tier.entries.len(),
            bytes: tier.total_bytes,
        }
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::with_default_limits()
    }
}

/// Statistics about memory tier performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of entries.
    pub size: usize,
    /// Current total size in bytes.
    pub bytes: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Memory: {} images ({} bytes), {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.bytes, self.hit_rate, self.hits, self.misses
        )
    }
}
