//! # Entity Module
//!
//! The files a placeholder can be generated for.
//!
//! - [`FileResource`] - an original upload: identifier (storage path), MIME
//!   type, size and lazily read contents
//! - [`ProcessedResource`] - a derivative of an original (crop, scale, ...)
//!   that may simply reuse the original's bytes
//!
//! [`LocalFile`] and [`LocalProcessedFile`] back both with a storage folder
//! on disk. Every accessor may fail; the generator turns such failures
//! into "no hash".

mod bytes;
mod local;

pub use bytes::{read_file_bytes, read_head, FileBytes};
pub use local::{mime_type_for, LocalFile, LocalProcessedFile};

use crate::error::ContentError;

/// An original file
pub trait FileResource: Send + Sync {
    /// Numeric primary key used for persistence
    fn uid(&self) -> u64;

    /// Storage path relative to the storage root, `/` separated
    fn identifier(&self) -> &str;

    fn mime_type(&self) -> Result<String, ContentError>;

    /// Byte size, `None` when unknown
    fn size(&self) -> Result<Option<u64>, ContentError>;

    fn contents(&self) -> Result<FileBytes, ContentError>;
}

/// A derivative produced from an original file
pub trait ProcessedResource: FileResource {
    /// Primary key of the original
    fn original_uid(&self) -> u64;

    /// The derivative has no pixels of its own and reuses the original verbatim
    fn uses_original_file(&self) -> bool;

    /// Whether the derivative's contents are a raster image
    fn is_image(&self) -> Result<bool, ContentError>;
}
