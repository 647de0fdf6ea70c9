//! Domain layer with core entities, errors and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{Bitmap, CacheKey, ImageSource, LoadedImage, News};
pub use errors::{DecodeError, LoadError, NetworkError, NewsError};
pub use ports::{ByteFetcherPort, ImageCachePort, ImageDecoderPort};
