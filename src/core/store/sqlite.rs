//! SQLite hash store over the catalog tables.

use super::{Database, HashStore, HashTable};
use crate::error::StoreError;
use rusqlite::{params, OptionalExtension};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Reads and writes `thumb_hash` of one catalog table
pub struct SqliteHashStore {
    db: Arc<Database>,
    table: HashTable,
    writes: AtomicUsize,
}

impl SqliteHashStore {
    pub fn new(db: Arc<Database>, table: HashTable) -> Self {
        Self {
            db,
            table,
            writes: AtomicUsize::new(0),
        }
    }

    /// Store for original file metadata
    pub fn file_metadata(db: Arc<Database>) -> Self {
        Self::new(db, HashTable::FileMetadata)
    }

    /// Store for derivatives
    pub fn processed_files(db: Arc<Database>) -> Self {
        Self::new(db, HashTable::ProcessedFile)
    }

    /// Number of rows this store has updated
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl HashStore for SqliteHashStore {
    fn table(&self) -> HashTable {
        self.table
    }

    fn read_hash(&self, uid: u64) -> Result<Option<String>, StoreError> {
        let sql = format!(
            "SELECT thumb_hash FROM {} WHERE {} = ?1",
            self.table.table_name(),
            self.table.key_column()
        );

        self.db.with_connection(|conn| {
            conn.query_row(&sql, params![uid as i64], |row| row.get::<_, String>(0))
                .optional()
        })
    }

    fn write_hash(&self, uid: u64, hash: &str) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE {} SET thumb_hash = ?1 WHERE {} = ?2",
            self.table.table_name(),
            self.table.key_column()
        );

        let changed = self
            .db
            .with_connection(|conn| conn.execute(&sql, params![hash, uid as i64]))?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                table: self.table.table_name(),
                uid,
            });
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
