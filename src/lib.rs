//! Gallery Courier - a Discord bot that publishes images to an FTP-hosted gallery.
//!
//! When the configured owner reacts to a message with the trigger emoji, the
//! first image attachment is downloaded, a compressed preview is generated and
//! both are uploaded next to an updated `database.json` manifest.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing use cases, services and DTOs.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;
/// Presentation layer driving the bot from gateway events.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "gallery-courier";
