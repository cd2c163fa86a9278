//! # Repository Module
//!
//! The file catalog: which originals and derivatives exist, where they
//! live under the storage root, and which still lack a placeholder.

mod indexer;

pub use indexer::{IndexResult, Indexer};

use crate::core::entity::{LocalFile, LocalProcessedFile};
use crate::core::store::Database;
use crate::error::StoreError;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A row of `files`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub uid: u64,
    pub identifier: String,
    pub mime_type: String,
    pub size: Option<u64>,
}

/// A row of `processed_files`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedRecord {
    pub uid: u64,
    pub original: u64,
    pub identifier: String,
    pub uses_original: bool,
}

/// Catalog access rooted at one storage folder
pub struct FileRepository {
    db: Arc<Database>,
    root: PathBuf,
}

impl FileRepository {
    pub fn new(db: Arc<Database>, root: impl Into<PathBuf>) -> Self {
        Self {
            db,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Register an original (or update its MIME type and size) and make
    /// sure its metadata row exists. Returns the file uid.
    pub fn add_file(
        &self,
        identifier: &str,
        mime_type: &str,
        size: Option<u64>,
    ) -> Result<u64, StoreError> {
        let identifier = normalize(identifier);
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO files (identifier, mime_type, size) VALUES (?1, ?2, ?3)
                 ON CONFLICT(identifier) DO UPDATE SET mime_type = excluded.mime_type, size = excluded.size",
                params![identifier, mime_type, size.map(|s| s as i64)],
            )?;
            let uid: i64 = conn.query_row(
                "SELECT uid FROM files WHERE identifier = ?1",
                params![identifier],
                |row| row.get(0),
            )?;
            conn.execute(
                "INSERT OR IGNORE INTO file_metadata (file) VALUES (?1)",
                params![uid],
            )?;
            Ok(uid as u64)
        })
    }

    /// Register a derivative of `original`. Returns its uid.
    pub fn add_processed_file(
        &self,
        original: u64,
        identifier: &str,
        uses_original: bool,
    ) -> Result<u64, StoreError> {
        let identifier = normalize(identifier);
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO processed_files (original, identifier, uses_original) VALUES (?1, ?2, ?3)",
                params![original as i64, identifier, uses_original],
            )?;
            Ok(conn.last_insert_rowid() as u64)
        })
    }

    pub fn file_record(&self, uid: u64) -> Result<Option<FileRecord>, StoreError> {
        self.db.with_connection(|conn| {
            conn.query_row(
                "SELECT uid, identifier, mime_type, size FROM files WHERE uid = ?1",
                params![uid as i64],
                file_from_row,
            )
            .optional()
        })
    }

    pub fn find_file(&self, uid: u64) -> Result<Option<LocalFile>, StoreError> {
        Ok(self.file_record(uid)?.map(|record| self.local_file(record)))
    }

    pub fn find_file_by_identifier(&self, identifier: &str) -> Result<Option<LocalFile>, StoreError> {
        let identifier = normalize(identifier);
        let record = self.db.with_connection(|conn| {
            conn.query_row(
                "SELECT uid, identifier, mime_type, size FROM files WHERE identifier = ?1",
                params![identifier],
                file_from_row,
            )
            .optional()
        })?;
        Ok(record.map(|record| self.local_file(record)))
    }

    pub fn find_processed_file(&self, uid: u64) -> Result<Option<LocalProcessedFile>, StoreError> {
        let record = self.db.with_connection(|conn| {
            conn.query_row(
                "SELECT uid, original, identifier, uses_original FROM processed_files WHERE uid = ?1",
                params![uid as i64],
                processed_from_row,
            )
            .optional()
        })?;

        match record {
            Some(record) => self.local_processed_file(record),
            None => Ok(None),
        }
    }

    /// Derivatives of one original
    pub fn processed_files_of(&self, original: u64) -> Result<Vec<LocalProcessedFile>, StoreError> {
        let records = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT uid, original, identifier, uses_original FROM processed_files
                 WHERE original = ?1 ORDER BY uid",
            )?;
            let rows = stmt.query_map(params![original as i64], processed_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })?;

        let mut files = Vec::with_capacity(records.len());
        for record in records {
            if let Some(file) = self.local_processed_file(record)? {
                files.push(file);
            }
        }
        Ok(files)
    }

    /// Originals of an allowed MIME type whose metadata has no placeholder
    pub fn pending_files(&self, mime_types: &[String], limit: usize) -> Result<Vec<LocalFile>, StoreError> {
        if mime_types.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; mime_types.len()].join(", ");
        let sql = format!(
            "SELECT f.uid, f.identifier, f.mime_type, f.size FROM files f
             JOIN file_metadata m ON m.file = f.uid
             WHERE m.thumb_hash = '' AND f.mime_type IN ({})
             ORDER BY f.uid LIMIT {}",
            placeholders, limit
        );

        let records = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(mime_types.iter()), file_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })?;

        Ok(records.into_iter().map(|record| self.local_file(record)).collect())
    }

    /// Derivatives of image originals that have no placeholder
    pub fn pending_processed_files(&self, limit: usize) -> Result<Vec<LocalProcessedFile>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let records = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.uid, p.original, p.identifier, p.uses_original FROM processed_files p
                 JOIN files f ON f.uid = p.original
                 WHERE p.thumb_hash = '' AND f.mime_type LIKE 'image/%'
                 ORDER BY p.uid LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], processed_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })?;

        let mut files = Vec::with_capacity(records.len());
        for record in records {
            if let Some(file) = self.local_processed_file(record)? {
                files.push(file);
            }
        }
        Ok(files)
    }

    fn local_file(&self, record: FileRecord) -> LocalFile {
        LocalFile::new(record.uid, self.root.clone(), record.identifier).with_mime_type(record.mime_type)
    }

    fn local_processed_file(&self, record: ProcessedRecord) -> Result<Option<LocalProcessedFile>, StoreError> {
        let Some(original) = self.find_file(record.original)? else {
            tracing::warn!(uid = record.uid, original = record.original, "derivative without original");
            return Ok(None);
        };

        Ok(Some(if record.uses_original {
            LocalProcessedFile::using_original(record.uid, original)
        } else {
            LocalProcessedFile::new(record.uid, original, record.identifier)
        }))
    }
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        uid: row.get::<_, i64>(0)? as u64,
        identifier: row.get(1)?,
        mime_type: row.get(2)?,
        size: row.get::<_, Option<i64>>(3)?.map(|s| s as u64),
    })
}

fn processed_from_row(row: &Row<'_>) -> rusqlite::Result<ProcessedRecord> {
    Ok(ProcessedRecord {
        uid: row.get::<_, i64>(0)? as u64,
        original: row.get::<_, i64>(1)? as u64,
        identifier: row.get(2)?,
        uses_original: row.get(3)?,
    })
}

fn normalize(identifier: &str) -> String {
    identifier.trim().replace('\\', "/").trim_matches('/').to_string()
}
