//! Domain error types.

mod decode_error;
mod load_error;
mod network_error;
mod news_error;

pub use decode_error::DecodeError;
pub use load_error::LoadError;
pub use network_error::NetworkError;
pub use news_error::NewsError;
