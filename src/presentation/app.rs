//! Command-line front end: wires the services together and runs one command.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr, eyre};
use reqwest::Url;
use tracing::{info, warn};

use crate::application::NewsPager;
use crate::domain::entities::{CacheKey, ImageStatus};
use crate::domain::ports::ImageCachePort;
use crate::infrastructure::config::{AppConfig, CacheCommand, Command};
use crate::infrastructure::display::FixedDisplayScale;
use crate::infrastructure::http::{NewsClient, ReqwestByteFetcher};
use crate::infrastructure::image::{ImageDownsampler, ImageLoader, ImagePrefetcher, TieredCache};
use crate::presentation::widgets::SlotTable;

/// Main application.
pub struct App {
    cache: Arc<TieredCache>,
    loader: ImageLoader,
    news: Arc<NewsClient>,
    items_per_page: u32,
}

impl App {
    /// Builds every service from the configuration.
    ///
    /// # Errors
    /// Returns error if the cache directory or an HTTP client cannot be created.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.loader.timeout_secs);

        let cache_dir = config.cache.effective_directory();
        let cache = Arc::new(
            TieredCache::new(cache_dir.clone(), config.cache.memory_limits())
                .await
                .wrap_err_with(|| format!("failed to open image cache at {}", cache_dir.display()))?,
        );

        let loader = ImageLoader::new(
            config.loader.to_loader_config(),
            Arc::new(ReqwestByteFetcher::new(timeout)?),
            Arc::new(ImageDownsampler::new(config.cache.jpeg_quality)),
            cache.clone(),
            Arc::new(FixedDisplayScale::new(
                config.display.width_points,
                config.display.scale,
            )),
        );

        let news = Arc::new(NewsClient::with_base_url(
            config.news.base_url.clone(),
            timeout,
        )?);

        Ok(Self {
            cache,
            loader,
            news,
            items_per_page: config.news.items_per_page,
        })
    }

    /// Runs a single command.
    ///
    /// # Errors
    /// Returns error if the command fails as a whole. Individual image
    /// failures are reported and do not fail the command.
    pub async fn run(self, command: Command) -> Result<()> {
        match command {
            Command::Load { urls } => self.load(urls).await,
            Command::Feed { page, per_page } => {
                self.feed(page, per_page.unwrap_or(self.items_per_page))
                    .await
            }
            Command::Cache { action } => self.cache(action).await,
        }
    }

    async fn load(&self, urls: Vec<String>) -> Result<()> {
        let mut slots = SlotTable::new(self.loader.clone());
        let mut bound = Vec::with_capacity(urls.len());
        for url in urls {
            let id = slots.create_slot();
            slots.bind(id, url.clone());
            bound.push((id, url));
        }

        while slots.has_pending() {
            if slots.next_event().await.is_none() {
                break;
            }
        }

        for (id, url) in &bound {
            let Some(slot) = slots.slot(*id) else {
                continue;
            };
            match (slot.status(), slot.bitmap()) {
                (ImageStatus::Ready, Some(bitmap)) => {
                    println!("{url}: {}x{}", bitmap.width(), bitmap.height());
                }
                (ImageStatus::Failed(reason), _) => println!("{url}: failed: {reason}"),
                (status, _) => println!("{url}: {status:?}"),
            }
        }

        println!("{}", self.cache.stats().await?);
        Ok(())
    }

    async fn feed(&self, page: u32, per_page: u32) -> Result<()> {
        let pager = NewsPager::new(self.news.clone(), per_page);
        let mut items = pager.load_first().await?;
        for _ in 1..page.max(1) {
            if !pager.can_load_more() {
                break;
            }
            items = pager.load_more().await?;
        }

        if items.is_empty() {
            println!("No news on page {page}");
            return Ok(());
        }

        for news in &items {
            println!(
                "[{}] {} | {} | {}",
                news.id,
                news.published_date.format("%Y-%m-%d %H:%M"),
                news.category,
                news.title
            );
        }

        let prefetcher = ImagePrefetcher::new(self.loader.clone());
        let started = prefetcher.prefetch(&items);
        info!(started, "Prefetching title images");
        prefetcher.wait_idle().await;

        println!("{}", self.cache.stats().await?);
        Ok(())
    }

    async fn cache(&self, action: CacheCommand) -> Result<()> {
        match action {
            CacheCommand::Key { url } => {
                println!("{}", CacheKey::derive(&parse_url(&url)?));
            }
            CacheCommand::Remove { url } => {
                let key = CacheKey::derive(&parse_url(&url)?);
                self.cache.remove(&key).await?;
                println!("Removed {key}");
            }
            CacheCommand::Clear => {
                if self.loader.in_flight_count() > 0 {
                    warn!("Clearing cache while loads are running");
                }
                self.loader.clear_cache().await?;
                println!("Cache cleared");
            }
            CacheCommand::Stats => println!("{}", self.cache.stats().await?),
        }
        Ok(())
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| eyre!("invalid URL {url}: {e}"))
}
