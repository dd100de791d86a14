use std::sync::atomic::{AtomicBool, Ordering};

use passkeep_core::error::StorageError;

use crate::backend::KeyValueBackend;

/// Prefix applied to every key when none is configured.
pub const DEFAULT_TOKEN_KEY_PREFIX: &str = "pwdless:";

/// Where a store's records live: a logical database and a key prefix
///
/// The database is selected lazily on the first operation. Concurrent first
/// operations may each issue the selection; selecting the same database twice is
/// harmless. A failed selection leaves the namespace unselected so the next
/// operation tries again.
#[derive(Debug)]
pub struct Namespace {
    database_index: u32,
    prefix: String,
    selected: AtomicBool,
}

impl Namespace {
    pub fn new(database_index: u32, prefix: impl Into<String>) -> Self {
        Self {
            database_index,
            prefix: prefix.into(),
            selected: AtomicBool::new(false),
        }
    }

    pub fn database_index(&self) -> u32 {
        self.database_index
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Storage key of the record belonging to `uid`
    pub fn key(&self, uid: &str) -> String {
        format!("{}{uid}", self.prefix)
    }

    /// Glob matching every key in the namespace
    ///
    /// Glob metacharacters in the prefix are escaped so the prefix only matches
    /// itself. Enumerating with this pattern scans the whole database and gets
    /// slow on large keyspaces.
    pub fn pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.prefix.len() + 1);
        for c in self.prefix.chars() {
            if matches!(c, '*' | '?' | '[' | ']' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('*');
        pattern
    }

    pub fn is_selected(&self) -> bool {
        self.selected.load(Ordering::Acquire)
    }

    /// Select the namespace's database unless an earlier call already did
    pub async fn ensure_selected<B>(&self, backend: &B) -> Result<(), StorageError>
    where
        B: KeyValueBackend + ?Sized,
    {
        if self.is_selected() {
            return Ok(());
        }

        backend.select(self.database_index).await?;
        self.selected.store(true, Ordering::Release);
        tracing::debug!(database_index = self.database_index, "Selected token database");
        Ok(())
    }
}
