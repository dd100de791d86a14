//! In-process key-value backend
//!
//! [`MemoryBackend`] behaves like a small Redis server: sixteen numbered databases,
//! hash values, per-key expiry with lazy eviction and glob enumeration. It lets a
//! token store run in tests and local development without a server.
//!
//! A backend value is one connection. [`MemoryBackend::connection`] opens another
//! connection to the same data with its own selected database, the way a second
//! client connection to one server would.
//!
//! Failures can be scheduled per operation with [`MemoryBackend::fail_next`] to
//! exercise error handling.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use dashmap::DashMap;
use glob::{MatchOptions, Pattern};
use passkeep_core::error::StorageError;

use crate::backend::KeyValueBackend;

/// Number of logical databases, matching a stock Redis configuration.
pub const DATABASE_COUNT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    HashGetAll,
    HashSet,
    Expire,
    Delete,
    CompareAndDelete,
    Keys,
    Ping,
}

#[derive(Debug, Clone)]
struct Entry {
    fields: HashMap<String, String>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug, Default)]
struct Shared {
    entries: DashMap<(u32, String), Entry>,
    faults: DashMap<Operation, usize>,
    calls: DashMap<Operation, usize>,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
    database: AtomicU32,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new connection to the same data, starting on database 0
    pub fn connection(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            database: AtomicU32::new(0),
        }
    }

    /// The database this connection currently addresses
    pub fn selected_database(&self) -> u32 {
        self.database.load(Ordering::Acquire)
    }

    /// Make the next call of `operation` fail, on any connection
    pub fn fail_next(&self, operation: Operation) {
        *self.shared.faults.entry(operation).or_insert(0) += 1;
    }

    /// How many times `operation` has been attempted, on any connection
    pub fn calls(&self, operation: Operation) -> usize {
        self.shared.calls.get(&operation).map_or(0, |count| *count)
    }

    /// Raw fields stored at `key` in `database`, ignoring expiry
    pub fn raw_fields(&self, database: u32, key: &str) -> Option<HashMap<String, String>> {
        self.shared
            .entries
            .get(&(database, key.to_string()))
            .map(|entry| entry.fields.clone())
    }

    /// Remaining store-level lifetime of `key` in `database`
    ///
    /// `None` when the key is absent or has no expiry.
    pub fn time_to_live(&self, database: u32, key: &str) -> Option<Duration> {
        self.shared
            .entries
            .get(&(database, key.to_string()))
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    fn begin(&self, operation: Operation) -> Result<(), StorageError> {
        *self.shared.calls.entry(operation).or_insert(0) += 1;

        let injected = match self.shared.faults.get_mut(&operation) {
            Some(mut remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };

        if !injected {
            return Ok(());
        }

        let message = format!("injected {operation:?} failure");
        Err(match operation {
            Operation::Select => StorageError::Select(message),
            Operation::Ping => StorageError::Connection(message),
            _ => StorageError::Database(message),
        })
    }

    fn slot(&self, key: &str) -> (u32, String) {
        (self.selected_database(), key.to_string())
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn select(&self, index: u32) -> Result<(), StorageError> {
        self.begin(Operation::Select)?;
        if index >= DATABASE_COUNT {
            return Err(StorageError::Select(format!(
                "DB index {index} is out of range"
            )));
        }

        self.database.store(index, Ordering::Release);
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StorageError> {
        self.begin(Operation::HashGetAll)?;
        let slot = self.slot(key);
        let now = Instant::now();

        // Expired keys are evicted on access.
        self.shared
            .entries
            .remove_if(&slot, |_, entry| !entry.is_live(now));

        Ok(self
            .shared
            .entries
            .get(&slot)
            .map(|entry| entry.fields.clone())
            .unwrap_or_default())
    }

    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StorageError> {
        self.begin(Operation::HashSet)?;
        let now = Instant::now();

        let mut entry = self.shared.entries.entry(self.slot(key)).or_insert(Entry {
            fields: HashMap::new(),
            expires_at: None,
        });

        if !entry.is_live(now) {
            entry.fields.clear();
            entry.expires_at = None;
        }

        // Existing expiry is kept, as Redis does for HSET.
        for (field, value) in fields {
            entry.fields.insert(field.clone(), value.clone());
        }

        Ok(())
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StorageError> {
        self.begin(Operation::Expire)?;
        let now = Instant::now();

        if let Some(mut entry) = self.shared.entries.get_mut(&self.slot(key)) {
            if entry.is_live(now) {
                entry.expires_at = Some(now + Duration::from_secs(seconds));
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.begin(Operation::Delete)?;
        self.shared.entries.remove(&self.slot(key));
        Ok(())
    }

    async fn compare_and_delete(
        &self,
        key: &str,
        field: &str,
        expected: &str,
    ) -> Result<bool, StorageError> {
        self.begin(Operation::CompareAndDelete)?;
        let now = Instant::now();

        let removed = self.shared.entries.remove_if(&self.slot(key), |_, entry| {
            entry.is_live(now) && entry.fields.get(field).is_some_and(|value| value == expected)
        });
        Ok(removed.is_some())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StorageError> {
        self.begin(Operation::Keys)?;
        let database = self.selected_database();
        let now = Instant::now();

        self.shared
            .entries
            .retain(|(db, _), entry| *db != database || entry.is_live(now));

        Ok(self
            .shared
            .entries
            .iter()
            .filter(|item| item.key().0 == database && glob_match(pattern, &item.key().1))
            .map(|item| item.key().1.clone())
            .collect())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.begin(Operation::Ping)
    }
}

/// Whether `candidate` matches the Redis glob `pattern`
///
/// Matching uses the `glob` crate with path separators treated as ordinary
/// characters, since Redis keys have no path structure. Redis syntax is rewritten
/// first: a `\` escape becomes a one-character class, `[^...]` becomes `[!...]`
/// and a run of `*` collapses to one. A pattern the crate cannot parse matches
/// nothing.
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    Pattern::new(&to_glob_syntax(pattern))
        .map(|pattern| pattern.matches_with(candidate, options))
        .unwrap_or(false)
}

fn to_glob_syntax(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next().unwrap_or('\\');
                if in_class || !matches!(escaped, '*' | '?' | '[' | ']') {
                    out.push(escaped);
                } else {
                    out.push('[');
                    out.push(escaped);
                    out.push(']');
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push('[');
                if chars.next_if_eq(&'^').is_some() {
                    out.push('!');
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            '*' if !in_class => {
                while chars.next_if_eq(&'*').is_some() {}
                out.push('*');
            }
            other => out.push(other),
        }
    }

    out
}
