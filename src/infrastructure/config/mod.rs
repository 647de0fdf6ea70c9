//! Application configuration.

pub mod app_config;
pub mod args;
pub mod storage;

pub use app_config::{
    AppConfig, CacheConfig, DisplayConfig, LoaderConfig, LogLevel, NewsConfig,
};
pub use args::{CacheCommand, CliArgs, Command};
pub use storage::{ConfigError, ConfigManager};
