//! Hash store trait definition.

use super::HashTable;
use crate::error::StoreError;

/// Persisted placeholder per entity, one row per uid
pub trait HashStore: Send + Sync {
    /// Which table this store reads and writes
    fn table(&self) -> HashTable;

    /// Raw stored value, `None` when the row holds nothing
    fn read_hash(&self, uid: u64) -> Result<Option<String>, StoreError>;

    /// Unconditionally overwrite the stored value
    fn write_hash(&self, uid: u64, hash: &str) -> Result<(), StoreError>;

    /// Stored placeholder; empty strings count as absent
    fn get_hash(&self, uid: u64) -> Result<Option<String>, StoreError> {
        Ok(self.read_hash(uid)?.filter(|hash| !hash.is_empty()))
    }

    /// Persist `hash` unless it is already stored.
    ///
    /// Returns whether a write happened. Read and write are not atomic;
    /// concurrent writers for one uid resolve last-write-wins.
    fn store_hash(&self, uid: u64, hash: &str) -> Result<bool, StoreError> {
        if self.read_hash(uid)?.as_deref() == Some(hash) {
            tracing::trace!(table = %self.table(), uid, "hash unchanged, write skipped");
            return Ok(false);
        }

        self.write_hash(uid, hash)?;
        tracing::debug!(table = %self.table(), uid, "hash stored");
        Ok(true)
    }
}
