//! # ThumbHash Pipeline
//!
//! Compact image placeholders for a file catalog.
//!
//! Every image-like file gets a ThumbHash: a short base64 string that a
//! client expands into a blurred preview while the real image loads.
//!
//! ## Architecture
//! - `config` - Feature toggle, MIME allow-list, excluded folders, processor
//! - `core` - Decoding, encoding, persistence, triggers and batch runs
//! - `events` - Progress reporting for long operations
//! - `error` - Error types per concern
//!
//! ## Example
//! ```no_run
//! use thumbhash_pipeline::config::Configuration;
//! use thumbhash_pipeline::core::generator::ThumbHashGenerator;
//!
//! let generator = ThumbHashGenerator::from_config(&Configuration::default())?;
//! let bytes = std::fs::read("photo.jpg").unwrap_or_default();
//! let hash = generator.generate_from_content(&bytes).ok();
//! # Ok::<(), thumbhash_pipeline::error::ConfigError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use config::{Configuration, ProcessorChoice};
pub use error::{Result, ThumbHashError};

/// Initialize tracing for the application.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies. Output goes
/// to stderr so stdout stays clean for command output.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
