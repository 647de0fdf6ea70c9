//! Image handling infrastructure.
//!
//! This module provides:
//! - Memory tier with count and size bounded LRU eviction
//! - Disk tier for persistence
//! - Downsampling decoder
//! - Deduplicating async image loading pipeline
//! - Feed image prefetching

pub mod disk_cache;
pub mod downsampler;
pub mod loader;
pub mod memory_cache;
pub mod prefetcher;
pub mod tiered_cache;

pub use disk_cache::{DiskImageCache, DiskUsage, default_cache_dir};
pub use downsampler::{DEFAULT_JPEG_QUALITY, ImageDownsampler};
pub use loader::{ImageLoader, ImageLoaderConfig, LoadHandle};
pub use memory_cache::{CacheStats, MemoryImageCache};
pub use prefetcher::ImagePrefetcher;
pub use tiered_cache::{MemoryLimits, TieredCache, TieredStats};
