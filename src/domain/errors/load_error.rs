//! Image load error types.

use thiserror::Error;

use super::{DecodeError, NetworkError};

/// Failure of a single image load as seen by a caller.
///
/// Cloneable so one pipeline result can be handed to every attached caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Fetching the bytes failed.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// The bytes could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The caller gave up on the load.
    #[error("image load cancelled")]
    Cancelled,
}

impl LoadError {
    /// Returns whether the caller cancelled. UI layers should stay quiet for these.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
