//! Newsfeed - a news reader engine with a deduplicating image pipeline.
//!
//! This crate fetches paged news and loads article images through a
//! memory and disk cache, sharing one download among concurrent requests
//! and delivering results only to the list cells still showing them.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing feed services.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;
/// Presentation layer containing the CLI and view bindings.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "newsfeed";
