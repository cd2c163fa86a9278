//! In-memory hash store for testing.

use super::{HashStore, HashTable};
use crate::error::StoreError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// In-memory hash store
///
/// Counts underlying writes so callers can check write suppression.
pub struct InMemoryHashStore {
    table: HashTable,
    hashes: RwLock<HashMap<u64, String>>,
    writes: AtomicUsize,
}

impl InMemoryHashStore {
    pub fn new(table: HashTable) -> Self {
        Self {
            table,
            hashes: RwLock::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Seed a value without counting it as a write
    pub fn insert(&self, uid: u64, hash: &str) -> Result<(), StoreError> {
        let mut hashes = self.hashes.write().map_err(|_| self.poisoned())?;
        hashes.insert(uid, hash.to_string());
        Ok(())
    }

    /// Number of writes that reached the map
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn poisoned(&self) -> StoreError {
        StoreError::Poisoned(format!("memory:{}", self.table))
    }
}

impl HashStore for InMemoryHashStore {
    fn table(&self) -> HashTable {
        self.table
    }

    fn read_hash(&self, uid: u64) -> Result<Option<String>, StoreError> {
        let hashes = self.hashes.read().map_err(|_| self.poisoned())?;
        Ok(hashes.get(&uid).cloned())
    }

    fn write_hash(&self, uid: u64, hash: &str) -> Result<(), StoreError> {
        let mut hashes = self.hashes.write().map_err(|_| self.poisoned())?;
        hashes.insert(uid, hash.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_absent_are_none() {
        let store = InMemoryHashStore::new(HashTable::FileMetadata);
        store.insert(2, "").unwrap();

        assert_eq!(store.get_hash(1).unwrap(), None);
        assert_eq!(store.get_hash(2).unwrap(), None);
    }

    #[test]
    fn repeated_store_writes_once() {
        let store = InMemoryHashStore::new(HashTable::FileMetadata);

        assert!(store.store_hash(1, "abc").unwrap());
        assert!(!store.store_hash(1, "abc").unwrap());

        assert_eq!(store.writes(), 1);
        assert_eq!(store.get_hash(1).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn changed_hash_is_written() {
        let store = InMemoryHashStore::new(HashTable::ProcessedFile);
        store.insert(1, "old").unwrap();

        assert!(store.store_hash(1, "new").unwrap());

        assert_eq!(store.writes(), 1);
        assert_eq!(store.get_hash(1).unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn seeded_equal_value_is_not_rewritten() {
        let store = InMemoryHashStore::new(HashTable::FileMetadata);
        store.insert(5, "same").unwrap();

        store.store_hash(5, "same").unwrap();

        assert_eq!(store.writes(), 0);
    }
}
