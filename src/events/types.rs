//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted while indexing, generating or watching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Catalog indexing events
    Index(IndexEvent),
    /// Batch generation events
    Batch(BatchEvent),
    /// File watcher events
    Watcher(WatcherEvent),
}

/// Events while registering files from a storage folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IndexEvent {
    Started { root: PathBuf },
    FileIndexed { identifier: String },
    Completed { total_files: usize },
}

/// Which part of a batch run is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchPhase {
    Originals,
    Processed,
}

impl std::fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchPhase::Originals => write!(f, "Originals"),
            BatchPhase::Processed => write!(f, "Processed files"),
        }
    }
}

/// Events during batch generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchEvent {
    /// A phase picked its candidates
    Started { phase: BatchPhase, total: usize },
    Progress(BatchProgress),
    /// A placeholder was generated and stored
    Generated { phase: BatchPhase, identifier: String },
    /// One item failed; the batch continues
    Warning {
        phase: BatchPhase,
        uid: u64,
        message: String,
    },
    Completed { summary: BatchSummary },
}

/// Progress within a phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProgress {
    pub phase: BatchPhase,
    pub completed: usize,
    pub total: usize,
    pub current: String,
}

/// Result of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Originals that received a placeholder
    pub originals_generated: usize,
    /// Derivatives that received a placeholder
    pub processed_generated: usize,
    /// Candidates skipped by exclusion or because they reuse the original
    pub skipped: usize,
    /// Candidates for which nothing could be produced
    pub failed: usize,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

impl BatchSummary {
    pub fn total_generated(&self) -> usize {
        self.originals_generated + self.processed_generated
    }
}

/// Events from the folder watcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WatcherEvent {
    /// Watcher started monitoring a folder
    Started { path: PathBuf },
    /// Watcher stopped monitoring a folder
    Stopped { path: PathBuf },
    /// A file appeared
    FileAdded { path: PathBuf },
    /// A file's contents changed
    FileModified { path: PathBuf },
    /// An error occurred
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Batch(BatchEvent::Progress(BatchProgress {
            phase: BatchPhase::Processed,
            completed: 3,
            total: 10,
            current: "_processed_/a.jpg".to_string(),
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Batch(BatchEvent::Progress(p)) => {
                assert_eq!(p.completed, 3);
                assert_eq!(p.phase, BatchPhase::Processed);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn summary_totals() {
        let summary = BatchSummary {
            originals_generated: 4,
            processed_generated: 2,
            ..BatchSummary::default()
        };
        assert_eq!(summary.total_generated(), 6);
    }
}
