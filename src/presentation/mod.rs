//! Presentation layer with the command-line front end and view bindings.

/// Command execution.
pub mod app;
/// Image slots for list cells.
pub mod widgets;

pub use app::App;
