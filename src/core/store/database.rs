//! SQLite catalog database.

use crate::error::StoreError;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS files (
        uid INTEGER PRIMARY KEY AUTOINCREMENT,
        identifier TEXT NOT NULL UNIQUE,
        mime_type TEXT NOT NULL,
        size INTEGER
    );
    CREATE TABLE IF NOT EXISTS file_metadata (
        uid INTEGER PRIMARY KEY AUTOINCREMENT,
        file INTEGER NOT NULL UNIQUE REFERENCES files(uid) ON DELETE CASCADE,
        thumb_hash TEXT NOT NULL DEFAULT ''
    );
    CREATE TABLE IF NOT EXISTS processed_files (
        uid INTEGER PRIMARY KEY AUTOINCREMENT,
        original INTEGER NOT NULL REFERENCES files(uid) ON DELETE CASCADE,
        identifier TEXT NOT NULL,
        uses_original INTEGER NOT NULL DEFAULT 0,
        thumb_hash TEXT NOT NULL DEFAULT ''
    );
    CREATE INDEX IF NOT EXISTS idx_processed_original ON processed_files(original);
";

/// Shared connection to the catalog
///
/// Uses WAL (Write-Ahead Logging) mode so readers proceed while a
/// write is in progress.
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    /// Open or create a catalog at the given path
    pub fn open(path: &Path) -> Result<Arc<Self>, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        Self::init(conn, path.to_path_buf())
    }

    /// Catalog that lives only as long as the connection
    pub fn open_in_memory() -> Result<Arc<Self>, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::OpenFailed {
            path: PathBuf::from(":memory:"),
            reason: e.to_string(),
        })?;

        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, db_path: PathBuf) -> Result<Arc<Self>, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        tracing::debug!(path = %db_path.display(), "catalog opened");

        Ok(Arc::new(Self {
            conn: Mutex::new(conn),
            db_path,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run `f` with exclusive access to the connection
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    ) -> Result<T, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Poisoned(self.db_path.display().to_string()))?;
        Ok(f(&conn)?)
    }
}
