mod byte_fetcher_port;
mod display_scale_port;
mod image_cache_port;
mod image_decoder_port;
mod news_port;

pub use byte_fetcher_port::ByteFetcherPort;
pub use display_scale_port::DisplayScalePort;
pub use image_cache_port::{CacheError, CacheResult, ImageCachePort};
pub use image_decoder_port::ImageDecoderPort;
pub use news_port::NewsPort;

#[cfg(test)]
pub mod mocks {
    pub use super::byte_fetcher_port::MockByteFetcherPort;
    pub use super::byte_fetcher_port::mock::ScriptedFetcher;
    pub use super::image_cache_port::mock::MockImageCache;
    pub use super::image_decoder_port::mock::CountingDecoder;
    pub use super::news_port::mock::MockNewsPort;
}
