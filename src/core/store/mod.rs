//! # Store Module
//!
//! Persists placeholders next to the file catalog.
//!
//! ## Tables
//! - `file_metadata` - one row per original file, keyed by `file`
//! - `processed_files` - one row per derivative, keyed by `uid`
//!
//! An empty `thumb_hash` column means "not generated yet".
//!
//! ## Backends
//! - `SqliteHashStore` - Persistent storage using SQLite
//! - `InMemoryHashStore` - For testing

mod database;
mod memory;
mod sqlite;
mod traits;

pub use database::Database;
pub use memory::InMemoryHashStore;
pub use sqlite::SqliteHashStore;
pub use traits::HashStore;

use std::fmt;

/// Tables holding a `thumb_hash` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashTable {
    /// Metadata of original files
    FileMetadata,
    /// Derivatives
    ProcessedFile,
}

impl HashTable {
    pub fn table_name(self) -> &'static str {
        match self {
            HashTable::FileMetadata => "file_metadata",
            HashTable::ProcessedFile => "processed_files",
        }
    }

    /// Column the entity uid is matched against
    pub fn key_column(self) -> &'static str {
        match self {
            HashTable::FileMetadata => "file",
            HashTable::ProcessedFile => "uid",
        }
    }
}

impl fmt::Display for HashTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}
