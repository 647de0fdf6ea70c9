//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Display resolution provider.
pub mod display;
/// HTTP clients.
pub mod http;
/// Image handling (caching, decoding, loading).
pub mod image;

pub use config::{AppConfig, CliArgs, ConfigManager, LogLevel};
pub use display::FixedDisplayScale;
pub use http::{NewsClient, ReqwestByteFetcher};
pub use image::{
    CacheStats, DiskImageCache, ImageDownsampler, ImagePrefetcher, ImageLoader, ImageLoaderConfig, LoadHandle,
    MemoryImageCache, MemoryLimits, TieredCache, TieredStats,
};
