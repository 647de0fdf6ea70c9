//! News fetching error types.

use thiserror::Error;

use super::NetworkError;

/// Failure while fetching or mapping the news feed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum NewsError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("failed to decode news response: {message}")]
    Decoding { message: String },

    #[error("invalid news item {id}: {message}")]
    Mapping { id: i64, message: String },

    #[error("a news page is already loading")]
    Busy,
}

impl NewsError {
    /// Creates decoding error.
    #[must_use]
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    /// Creates mapping error.
    #[must_use]
    pub fn mapping(id: i64, message: impl Into<String>) -> Self {
        Self::Mapping {
            id,
            message: message.into(),
        }
    }
}
