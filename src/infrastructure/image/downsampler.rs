//! Decoding, downsampling and re-encoding with the `image` crate.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage};
use tracing::trace;

use crate::domain::entities::Bitmap;
use crate::domain::errors::DecodeError;
use crate::domain::ports::ImageDecoderPort;

/// Default JPEG quality for cached images.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Decoder backed by the `image` crate. All work runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct ImageDownsampler {
    jpeg_quality: u8,
}

impl ImageDownsampler {
    /// Creates a decoder encoding cache entries at `jpeg_quality` (1-100).
    #[must_use]
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    fn decode_blocking(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::invalid_data("empty image data"));
        }
        Ok(image::load_from_memory(bytes)?)
    }

    /// Shrinks `img` so its longest side fits `max_dimension`, keeping aspect ratio.
    /// Never upscales.
    fn fit(img: DynamicImage, max_dimension: u32) -> DynamicImage {
        let max_dimension = max_dimension.max(1);
        if img.width() <= max_dimension && img.height() <= max_dimension {
            return img;
        }
        img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
    }
}

impl Default for ImageDownsampler {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, DecodeError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DecodeError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DecodeError::invalid_data(format!("Decode task failed: {e}")))?
}

#[async_trait]
impl ImageDecoderPort for ImageDownsampler {
    async fn downsample(&self, bytes: Bytes, max_dimension: u32) -> Result<Bitmap, DecodeError> {
        run_blocking(move || {
            let img = Self::decode_blocking(&bytes)?;
            let (width, height) = (img.width(), img.height());
            let fitted = Self::fit(img, max_dimension);
            trace!(
                width,
                height,
                new_width = fitted.width(),
                new_height = fitted.height(),
                "Downsampled image"
            );
            Ok(Bitmap::new(fitted.into_rgba8()))
        })
        .await
    }

    async fn decode(&self, bytes: Bytes) -> Result<Bitmap, DecodeError> {
        run_blocking(move || Ok(Bitmap::new(Self::decode_blocking(&bytes)?.into_rgba8()))).await
    }

    async fn encode(&self, bitmap: &Bitmap) -> Result<Bytes, DecodeError> {
        let bitmap = bitmap.clone();
        let quality = self.jpeg_quality;
        run_blocking(move || {
            let rgb: RgbImage = bitmap.pixels().convert();
            let mut out = Cursor::new(Vec::new());
            JpegEncoder::new_with_quality(&mut out, quality).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;
            Ok(Bytes::from(out.into_inner()))
        })
        .await
    }
}
