use std::collections::HashMap;

use async_trait::async_trait;
use passkeep_core::error::StorageError;

/// The key-value operations a token store needs from its backing store
///
/// A backend value is one connection, and the database chosen with
/// [`KeyValueBackend::select`] belongs to it. Each token store therefore owns its
/// backend; stores that should share data open separate connections to it.
///
/// Every operation addresses a single key and is expected to be atomic for that
/// key. Nothing here spans more than one key, so a backend does not need
/// multi-key transactions.
#[async_trait]
pub trait KeyValueBackend: Send + Sync + 'static {
    /// Switch this connection to the logical database `index`
    async fn select(&self, index: u32) -> Result<(), StorageError>;

    /// Read every field of the hash at `key`, an empty map when the key is absent
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StorageError>;

    /// Write several fields of the hash at `key` in one operation
    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StorageError>;

    /// Expire `key` after `seconds`
    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StorageError>;

    /// Delete `key`, succeeding when it does not exist
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Delete `key` only while its hash field `field` holds `expected`
    ///
    /// The comparison and the deletion happen as one step. Returns whether the key
    /// was deleted.
    async fn compare_and_delete(
        &self,
        key: &str,
        field: &str,
        expected: &str,
    ) -> Result<bool, StorageError>;

    /// Enumerate the keys matching a glob `pattern`
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StorageError>;

    async fn ping(&self) -> Result<(), StorageError>;
}
