//! Network error types.

use thiserror::Error;

/// Failure while talking to a remote host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum NetworkError {
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("server responded with HTTP {status}")]
    ServerError { status: u16 },

    #[error("transport error: {message}")]
    Transport { message: String },
}

impl NetworkError {
    /// Creates invalid URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns the HTTP status for server errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::ServerError { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::ServerError {
                status: status.as_u16(),
            };
        }
        Self::transport(err.to_string())
    }
}
