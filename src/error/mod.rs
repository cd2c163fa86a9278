//! # Error Module
//!
//! Error types for placeholder generation.
//!
//! ## Design Principles
//! - **Never panic** on untrusted image data - return errors instead
//! - **Include context** - identifiers, dimensions, limits
//! - **Collapse at the boundary** - the generator turns every
//!   [`GenerateError`] into "no hash", everything else reaches the caller

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ThumbHashError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Generation failed: {0}")]
    Generate(#[from] GenerateError),

    #[error("Watcher error: {0}")]
    Watcher(#[from] WatcherError),
}

/// Errors raised while loading configuration or selecting a processor
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unknown image processor '{0}' (expected auto, image or fast)")]
    UnknownProcessor(String),

    #[error("Image processor '{0}' is not available in this build")]
    ProcessorUnavailable(String),
}

/// Errors raised by an image processor while turning bytes into pixels
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unrecognized image format")]
    UnsupportedFormat,

    #[error("Image dimensions {width}x{height} exceed the maximum of {max_dimension}px per side")]
    DimensionsTooLarge {
        width: u32,
        height: u32,
        max_dimension: u32,
    },

    #[error("Image has {pixels} pixels, more than the limit of {max_pixels}")]
    TooManyPixels { pixels: u64, max_pixels: u64 },

    #[error("Image has no pixels")]
    EmptyImage,

    #[error("Memory budget of {limit_bytes} bytes exceeded ({required_bytes} required)")]
    BudgetExceeded {
        required_bytes: u64,
        limit_bytes: u64,
    },

    #[error("Failed to decode image: {0}")]
    Backend(String),

    #[error("Failed to resize image: {0}")]
    Resize(String),
}

/// Errors reading an entity's metadata or bytes
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Content unavailable for {identifier}: {reason}")]
    Unavailable { identifier: String, reason: String },
}

/// Errors raised by the hash encoder
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("{width}x{height} does not fit in 100x100")]
    TooLarge { width: u32, height: u32 },

    #[error("Pixel buffer holds {actual} bytes, expected {expected}")]
    BufferMismatch { expected: usize, actual: usize },
}

/// Every way placeholder generation can fail.
///
/// Internal to the generator; callers only ever see `Option<String>`.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("File too large for placeholder generation ({size} bytes, max {max_size})")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("File has no content")]
    EmptyContent,

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Errors that occur with the hash store or file catalog
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Store lock poisoned for {0}")]
    Poisoned(String),

    #[error("No {table} row for uid {uid}")]
    NotFound { table: &'static str, uid: u64 },
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        StoreError::QueryFailed(error.to_string())
    }
}

/// Errors that can occur while watching folders
#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to initialize watcher: {0}")]
    InitFailed(String),

    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Failed to watch {}: {reason}", .path.display())]
    WatchFailed { path: PathBuf, reason: String },

    #[error("Failed to unwatch {}: {reason}", .path.display())]
    UnwatchFailed { path: PathBuf, reason: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, ThumbHashError>;
