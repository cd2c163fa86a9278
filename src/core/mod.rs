//! # Core Module
//!
//! The placeholder engine, independent of any front end.
//!
//! ## Modules
//! - `matcher` - Path exclusion patterns
//! - `processor` - Decoding backends that yield small RGBA buffers
//! - `generator` - Turns file contents into ThumbHash strings
//! - `store` - Idempotent hash persistence
//! - `repository` - The SQLite file catalog
//! - `policy` - Decides which lifecycle signals trigger generation
//! - `resolver` - On-demand read path
//! - `batch` - Backfills missing placeholders
//! - `watcher` - Turns folder changes into lifecycle signals

pub mod batch;
pub mod entity;
pub mod generator;
pub mod matcher;
pub mod policy;
pub mod processor;
pub mod repository;
pub mod resolver;
pub mod store;
pub mod watcher;

// Re-export commonly used types
pub use entity::{FileResource, LocalFile, LocalProcessedFile, ProcessedResource};
pub use generator::ThumbHashGenerator;
pub use policy::{Decision, FileProcessingHandler, HandleOutcome, LifecycleSignal, SkipReason, TriggerPolicy};
pub use processor::{ImageProcessor, ProcessorFactory, ProcessorKind};
pub use resolver::{FileReference, ThumbHashResolver};
pub use store::{Database, HashStore, HashTable, SqliteHashStore};
