//! Registers the files of a storage folder in the catalog.

use super::FileRepository;
use crate::core::entity::mime_type_for;
use crate::core::matcher::ExcludedFolders;
use crate::error::StoreError;
use crate::events::{Event, EventSender, IndexEvent};
use std::path::Path;
use std::sync::Arc;
use walkdir::{DirEntry, WalkDir};

/// Result of an indexing run
#[derive(Debug, Clone, Default)]
pub struct IndexResult {
    /// Uids of the registered files, in walk order
    pub files: Vec<u64>,
    /// Entries that could not be read
    pub errors: Vec<String>,
}

/// Walks the storage root and registers every regular file as an original.
///
/// Hidden entries and files under excluded folders are skipped.
pub struct Indexer {
    repository: Arc<FileRepository>,
    excluded: ExcludedFolders,
    follow_symlinks: bool,
}

impl Indexer {
    pub fn new(repository: Arc<FileRepository>) -> Self {
        Self {
            repository,
            excluded: ExcludedFolders::default(),
            follow_symlinks: false,
        }
    }

    pub fn with_excluded(mut self, excluded: ExcludedFolders) -> Self {
        self.excluded = excluded;
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn index(&self, events: &EventSender) -> Result<IndexResult, StoreError> {
        let root = self.repository.root().to_path_buf();
        events.send(Event::Index(IndexEvent::Started { root: root.clone() }));

        let mut result = IndexResult::default();
        let walker = WalkDir::new(&root)
            .follow_links(self.follow_symlinks)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry));

        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    result.errors.push(e.to_string());
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(identifier) = relative_identifier(&root, entry.path()) else {
                continue;
            };
            if self.excluded.is_excluded(&identifier) {
                tracing::trace!(identifier, "excluded from index");
                continue;
            }

            let size = entry.metadata().ok().map(|metadata| metadata.len());
            let uid = self
                .repository
                .add_file(&identifier, &mime_type_for(entry.path()), size)?;

            events.send(Event::Index(IndexEvent::FileIndexed {
                identifier: identifier.clone(),
            }));
            result.files.push(uid);
        }

        tracing::info!(files = result.files.len(), errors = result.errors.len(), "index complete");
        events.send(Event::Index(IndexEvent::Completed {
            total_files: result.files.len(),
        }));

        Ok(result)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn relative_identifier(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::FileResource;
    use crate::core::store::Database;
    use crate::events::EventChannel;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<FileRepository>) {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let repository = Arc::new(FileRepository::new(db, dir.path()));
        (dir, repository)
    }

    fn touch(dir: &TempDir, relative: &str) {
        let path = dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn registers_files_with_relative_identifiers() {
        let (dir, repository) = setup();
        touch(&dir, "a.jpg");
        touch(&dir, "2024/trip/b.png");

        let result = Indexer::new(Arc::clone(&repository))
            .index(&crate::events::null_sender())
            .unwrap();

        assert_eq!(result.files.len(), 2);
        let nested = repository
            .find_file_by_identifier("2024/trip/b.png")
            .unwrap()
            .unwrap();
        assert_eq!(nested.mime_type().unwrap(), "image/png");
        assert_eq!(nested.size().unwrap(), Some(1));
    }

    #[test]
    fn skips_hidden_and_excluded_entries() {
        let (dir, repository) = setup();
        touch(&dir, "keep.jpg");
        touch(&dir, ".hidden.jpg");
        touch(&dir, ".cache/c.jpg");
        touch(&dir, "_processed_/keep.thumb.jpg");

        let result = Indexer::new(Arc::clone(&repository))
            .with_excluded(ExcludedFolders::new(vec!["_processed_/".to_string()]))
            .index(&crate::events::null_sender())
            .unwrap();

        assert_eq!(result.files.len(), 1);
        assert!(repository.find_file_by_identifier("keep.jpg").unwrap().is_some());
    }

    #[test]
    fn reindexing_keeps_uids() {
        let (dir, repository) = setup();
        touch(&dir, "a.jpg");
        let indexer = Indexer::new(repository);

        let first = indexer.index(&crate::events::null_sender()).unwrap();
        let second = indexer.index(&crate::events::null_sender()).unwrap();

        assert_eq!(first.files, second.files);
    }

    #[test]
    fn reports_progress_events() {
        let (dir, repository) = setup();
        touch(&dir, "a.jpg");
        touch(&dir, "b.gif");
        let (sender, receiver) = EventChannel::new();

        Indexer::new(repository).index(&sender).unwrap();
        drop(sender);

        let events: Vec<_> = receiver.iter().collect();
        assert!(matches!(events.first(), Some(Event::Index(IndexEvent::Started { .. }))));
        assert!(matches!(
            events.last(),
            Some(Event::Index(IndexEvent::Completed { total_files: 2 }))
        ));
        let indexed = events
            .iter()
            .filter(|event| matches!(event, Event::Index(IndexEvent::FileIndexed { .. })))
            .count();
        assert_eq!(indexed, 2);
    }
}
