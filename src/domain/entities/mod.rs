//! Domain entity definitions.

mod image;
mod news;

pub use image::{Bitmap, CacheKey, ImageSource, ImageStatus, LoadedImage};
pub use news::{News, NewsId};
