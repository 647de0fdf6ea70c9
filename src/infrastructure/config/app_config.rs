//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::args::CliArgs;
use crate::infrastructure::display::{DEFAULT_SCALE, DEFAULT_WIDTH_POINTS};
use crate::infrastructure::http::{DEFAULT_NEWS_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::infrastructure::image::{
    DEFAULT_JPEG_QUALITY, ImageLoaderConfig, MemoryLimits, default_cache_dir,
};

pub(crate) const APP_NAME: &str = "newsfeed";
pub(crate) const APP_QUALIFIER: &str = "com";
pub(crate) const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, read from `config.toml` and overridden from the CLI.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Image cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Target display configuration.
    #[serde(default)]
    pub display: DisplayConfig,

    /// Image loader configuration.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// News API configuration.
    #[serde(default)]
    pub news: NewsConfig,
}

/// Image cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory. Defaults to the platform cache dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Maximum number of images in the memory tier.
    #[serde(default = "default_memory_count_limit")]
    pub memory_count_limit: usize,

    /// Maximum total bytes in the memory tier.
    #[serde(default = "default_memory_size_limit")]
    pub memory_size_limit: usize,

    /// JPEG quality for re-encoded cache entries (1-100).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl CacheConfig {
    /// Returns the configured directory or the platform default.
    #[must_use]
    pub fn effective_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(default_cache_dir)
    }

    /// Returns memory tier limits.
    #[must_use]
    pub const fn memory_limits(&self) -> MemoryLimits {
        MemoryLimits {
            count: self.memory_count_limit,
            size: self.memory_size_limit,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            memory_count_limit: default_memory_count_limit(),
            memory_size_limit: default_memory_size_limit(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// Target display configuration used to size decoded bitmaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Screen width in points.
    #[serde(default = "default_width_points")]
    pub width_points: f64,

    /// Pixels per point.
    #[serde(default = "default_scale")]
    pub scale: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width_points: default_width_points(),
            scale: default_scale(),
        }
    }
}

/// Image loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Maximum downloads running at the same time.
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl LoaderConfig {
    /// Converts to the loader's runtime configuration.
    #[must_use]
    pub fn to_loader_config(&self) -> ImageLoaderConfig {
        ImageLoaderConfig {
            max_concurrent_downloads: self.max_concurrent_downloads.max(1),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: default_max_concurrent_downloads(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// News API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Articles per page.
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u32,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            items_per_page: default_items_per_page(),
        }
    }
}

const fn default_memory_count_limit() -> usize {
    crate::infrastructure::image::memory_cache::DEFAULT_COUNT_LIMIT
}

const fn default_memory_size_limit() -> usize {
    crate::infrastructure::image::memory_cache::DEFAULT_SIZE_LIMIT
}

const fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

const fn default_width_points() -> f64 {
    DEFAULT_WIDTH_POINTS
}

const fn default_scale() -> f64 {
    DEFAULT_SCALE
}

const fn default_max_concurrent_downloads() -> usize {
    4
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_base_url() -> String {
    DEFAULT_NEWS_BASE_URL.to_string()
}

const fn default_items_per_page() -> u32 {
    15
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache.directory = Some(cache_dir.clone());
        }
        if let Some(max) = args.max_concurrent_downloads {
            self.loader.max_concurrent_downloads = max;
        }
        if let Some(scale) = args.scale {
            self.display.scale = scale;
        }
        if let Some(base_url) = &args.base_url {
            self.news.base_url.clone_from(base_url);
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("newsfeed.log"))
    }

    /// Returns effective config path.
    #[must_use]
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Self::default_config_path)
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}
