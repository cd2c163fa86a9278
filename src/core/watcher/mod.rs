//! # Folder Watcher Module
//!
//! Turns filesystem changes under the storage root into lifecycle signals.
//!
//! - a created file is registered in the catalog and raises `FileAdded`
//! - a modified catalog file raises `FileContentsSet`
//!
//! Removals are ignored; rows follow their files outside this crate.

use crate::core::entity::{mime_type_for, LocalFile};
use crate::core::policy::{FileProcessingHandler, HandleOutcome, LifecycleSignal};
use crate::core::repository::FileRepository;
use crate::error::{StoreError, WatcherError};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Configuration for the folder watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Whether to watch subdirectories recursively
    pub recursive: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { recursive: true }
    }
}

/// A change to a regular file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Added(PathBuf),
    Modified(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Added(path) | FileChange::Modified(path) => path,
        }
    }
}

/// Watches folders and reports [`FileChange`]s to a callback
pub struct FolderWatcher {
    watcher: RecommendedWatcher,
    config: WatcherConfig,
    watched_paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl FolderWatcher {
    /// Create a watcher; `on_error` receives backend errors
    pub fn new<F, E>(config: WatcherConfig, on_change: F, on_error: E) -> Result<Self, WatcherError>
    where
        F: Fn(FileChange) + Send + 'static,
        E: Fn(String) + Send + 'static,
    {
        let watcher = notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
            match result {
                Ok(event) => {
                    for change in Self::process_event(event) {
                        on_change(change);
                    }
                }
                Err(e) => on_error(e.to_string()),
            }
        })
        .map_err(|e| WatcherError::InitFailed(e.to_string()))?;

        Ok(Self {
            watcher,
            config,
            watched_paths: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// Map a notify event to file changes
    fn process_event(event: Event) -> Vec<FileChange> {
        let make: fn(PathBuf) -> FileChange = match event.kind {
            EventKind::Create(_) => FileChange::Added,
            EventKind::Modify(_) => FileChange::Modified,
            _ => return Vec::new(),
        };

        event
            .paths
            .into_iter()
            .filter(|path| !Self::is_hidden(path))
            .map(make)
            .collect()
    }

    /// Editor swap files and other dotfiles
    fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with('.'))
            .unwrap_or(true)
    }

    /// Start watching a directory
    pub fn watch(&mut self, path: impl AsRef<Path>) -> Result<(), WatcherError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(WatcherError::PathNotFound(path));
        }

        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        self.watcher
            .watch(&path, mode)
            .map_err(|e| WatcherError::WatchFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if let Ok(mut paths) = self.watched_paths.lock() {
            paths.insert(path);
        }

        Ok(())
    }

    /// Stop watching a directory
    pub fn unwatch(&mut self, path: impl AsRef<Path>) -> Result<(), WatcherError> {
        let path = path.as_ref();

        self.watcher
            .unwatch(path)
            .map_err(|e| WatcherError::UnwatchFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if let Ok(mut paths) = self.watched_paths.lock() {
            paths.remove(path);
        }

        Ok(())
    }

    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched_paths
            .lock()
            .map(|paths| paths.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_watching(&self, path: impl AsRef<Path>) -> bool {
        self.watched_paths
            .lock()
            .map(|paths| paths.contains(path.as_ref()))
            .unwrap_or(false)
    }
}

/// Feeds file changes through the catalog and the lifecycle handler
pub struct ChangeDispatcher {
    repository: Arc<FileRepository>,
    handler: Arc<FileProcessingHandler>,
    roots: Vec<PathBuf>,
}

impl ChangeDispatcher {
    pub fn new(repository: Arc<FileRepository>, handler: Arc<FileProcessingHandler>) -> Self {
        let root = repository.root().to_path_buf();
        let mut roots = vec![root.clone()];
        // Backends may report canonical paths
        if let Ok(canonical) = root.canonicalize() {
            if canonical != root {
                roots.push(canonical);
            }
        }
        Self {
            repository,
            handler,
            roots,
        }
    }

    /// Identifier of `path` relative to the storage root.
    ///
    /// Paths with a hidden component (the catalog's own `.thumbhash/`
    /// folder among them) have none, matching what the indexer skips.
    pub fn identifier_for(&self, path: &Path) -> Option<String> {
        let relative = self
            .roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())?;

        let parts: Vec<&str> = relative
            .components()
            .map(|component| match component {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect::<Option<_>>()?;

        if parts.is_empty() || parts.iter().any(|part| part.starts_with('.')) {
            return None;
        }
        Some(parts.join("/"))
    }

    /// Handle one change; `None` when it concerns nothing in the catalog
    pub fn dispatch(&self, change: &FileChange) -> Result<Option<HandleOutcome>, StoreError> {
        let path = change.path();
        if !path.is_file() {
            return Ok(None);
        }
        let Some(identifier) = self.identifier_for(path) else {
            return Ok(None);
        };

        match change {
            FileChange::Added(_) => {
                let file = match self.repository.find_file_by_identifier(&identifier)? {
                    Some(file) => file,
                    None => self.register(&identifier, path)?,
                };
                Ok(Some(self.handler.handle(LifecycleSignal::FileAdded(&file))?))
            }
            FileChange::Modified(_) => match self.repository.find_file_by_identifier(&identifier)? {
                Some(file) => Ok(Some(self.handler.handle(LifecycleSignal::FileContentsSet(&file))?)),
                None => Ok(None),
            },
        }
    }

    fn register(&self, identifier: &str, path: &Path) -> Result<LocalFile, StoreError> {
        let mime_type = mime_type_for(path);
        let size = std::fs::metadata(path).ok().map(|metadata| metadata.len());

        let uid = self.repository.add_file(identifier, &mime_type, size)?;
        tracing::debug!(uid, identifier, "file registered from watcher");

        self.repository
            .find_file(uid)?
            .ok_or(StoreError::NotFound { table: "files", uid })
    }
}
