//! Domain types for image handling.

use std::sync::Arc;

use reqwest::Url;

/// Key addressing an image in both cache tiers.
///
/// Built from the last two path segments of the image URL joined with `_`.
/// URLs that only differ in host, query string or earlier segments map to the
/// same key. This keeps file names short and is relied upon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key from an already normalized string.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(sanitize(&key.into()))
    }

    /// Derives the key for a URL. Pure, no I/O.
    #[must_use]
    pub fn derive(url: &Url) -> Self {
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let raw = match segments.as_slice() {
            [] => url.host_str().unwrap_or("root").to_string(),
            [only] => (*only).to_string(),
            [.., parent, last] => format!("{parent}_{last}"),
        };

        Self(sanitize(&raw))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '%') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.as_str() {
        "" => "root".to_string(),
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned,
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&Url> for CacheKey {
    fn from(url: &Url) -> Self {
        Self::derive(url)
    }
}

/// Decoded RGBA image, ready to hand to a renderer.
///
/// Clones share the pixel buffer.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pixels: Arc<image::RgbaImage>,
}

impl Bitmap {
    /// Wraps an RGBA buffer.
    #[must_use]
    pub fn new(pixels: image::RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Borrow of the pixel buffer.
    #[must_use]
    pub fn pixels(&self) -> &image::RgbaImage {
        &self.pixels
    }

    /// True if both bitmaps point at the same pixel buffer.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

/// Status of an image bound to a visual slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageStatus {
    /// Nothing bound yet.
    #[default]
    NotStarted,
    /// A load is outstanding.
    Loading,
    /// Image is ready for display.
    Ready,
    /// Loading failed; a placeholder is shown.
    Failed(String),
}

impl ImageStatus {
    /// Returns true if the image is ready for rendering.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns true if the image is currently being loaded.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns true if loading failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Where an image was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Served from the memory or disk tier.
    Cache,
    /// Downloaded and decoded by a pipeline, possibly shared with other callers.
    Network,
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// A loaded image with provenance.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Key the image was loaded under.
    pub key: CacheKey,
    /// The decoded bitmap.
    pub bitmap: Bitmap,
    /// Where it came from.
    pub source: ImageSource,
}
