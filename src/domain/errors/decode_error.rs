//! Image decoding error types.

use thiserror::Error;

/// Failure while decoding or encoding image data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum DecodeError {
    #[error("invalid image data: {reason}")]
    InvalidData { reason: String },
}

impl DecodeError {
    /// Creates invalid data error.
    #[must_use]
    pub fn invalid_data(reason: impl Into<String>) -> Self {
        Self::InvalidData {
            reason: reason.into(),
        }
    }
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        Self::invalid_data(err.to_string())
    }
}
