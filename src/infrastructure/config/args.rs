use super::app_config::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments. Global options override `config.toml`.
#[derive(Debug, Parser)]
#[command(
    name = "newsfeed",
    version,
    about = "News feed reader with a cached image pipeline",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Image cache directory.
    #[arg(long, value_name = "PATH", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Maximum downloads running at the same time.
    #[arg(long, global = true)]
    pub max_concurrent_downloads: Option<usize>,

    /// Display pixels per point.
    #[arg(long, global = true)]
    pub scale: Option<f64>,

    /// News API base URL.
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load images through the cache and report where each came from.
    Load {
        /// Image URLs.
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Fetch a news page and prefetch its title images.
    Feed {
        /// Page number, starting at 1.
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Articles per page.
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Inspect or modify the image cache.
    Cache {
        /// Cache operation.
        #[command(subcommand)]
        action: CacheCommand,
    },
}

/// Operations on the image cache.
#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Print the cache key of a URL.
    Key {
        /// Image URL.
        url: String,
    },
    /// Remove one image from both tiers.
    Remove {
        /// Image URL.
        url: String,
    },
    /// Delete every cached image.
    Clear,
    /// Print cache statistics.
    Stats,
}
