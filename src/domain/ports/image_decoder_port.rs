//! Port for turning image bytes into bitmaps and back.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::Bitmap;
use crate::domain::errors::DecodeError;

/// Decodes, downsamples and re-encodes images.
/// Implementations keep CPU-heavy work off the async workers.
#[async_trait]
pub trait ImageDecoderPort: Send + Sync {
    /// Decodes `bytes` so that the longest side is at most `max_dimension`.
    async fn downsample(&self, bytes: Bytes, max_dimension: u32) -> Result<Bitmap, DecodeError>;

    /// Decodes bytes that were produced by [`Self::encode`], without resizing.
    async fn decode(&self, bytes: Bytes) -> Result<Bitmap, DecodeError>;

    /// Encodes a bitmap into the cache format.
    async fn encode(&self, bitmap: &Bitmap) -> Result<Bytes, DecodeError>;
}
