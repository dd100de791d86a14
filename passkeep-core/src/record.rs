//! The persisted token record
//!
//! Each user holds at most one record, stored as a flat hash of string fields:
//!
//! | Field    | Type     | Description                                            |
//! | -------- | -------- | ------------------------------------------------------ |
//! | `token`  | `String` | bcrypt hash of the issued token, never the plaintext.  |
//! | `origin` | `String` | URL requested before login, empty when none was given. |
//! | `ttl`    | `i64`    | Expiry as milliseconds since the Unix epoch.           |
//!
//! The `ttl` field holds an absolute timestamp despite its name; the field names
//! match records written by other passwordless token stores sharing the keyspace.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

pub const FIELD_TOKEN: &str = "token";
pub const FIELD_ORIGIN: &str = "origin";
pub const FIELD_EXPIRES_AT: &str = "ttl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub hashed_token: String,
    pub origin: String,
    pub expires_at: i64,
}

impl TokenRecord {
    pub fn new(hashed_token: String, origin: Option<&str>, expires_at: i64) -> Self {
        Self {
            hashed_token,
            origin: origin.unwrap_or_default().to_string(),
            expires_at,
        }
    }

    /// Whether the record is past its expiry at `now_ms`.
    ///
    /// A record expiring exactly at `now_ms` is still valid.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }

    pub fn expires_at_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expires_at)
    }

    /// Field/value pairs written in a single multi-field set.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        vec![
            (FIELD_TOKEN.to_string(), self.hashed_token.clone()),
            (FIELD_ORIGIN.to_string(), self.origin.clone()),
            (FIELD_EXPIRES_AT.to_string(), self.expires_at.to_string()),
        ]
    }

    /// Rebuild a record from the fields read back from the store.
    ///
    /// An empty map means the key does not exist and yields `Ok(None)`. A map that
    /// exists but lacks the token or expiry, or whose expiry is not an integer, is
    /// corrupt. A missing origin reads as the empty string.
    pub fn from_fields(mut fields: HashMap<String, String>) -> Result<Option<Self>, StorageError> {
        if fields.is_empty() {
            return Ok(None);
        }

        let hashed_token = fields.remove(FIELD_TOKEN).ok_or_else(|| {
            StorageError::CorruptRecord(format!("missing field `{FIELD_TOKEN}`"))
        })?;

        let raw_expires_at = fields.remove(FIELD_EXPIRES_AT).ok_or_else(|| {
            StorageError::CorruptRecord(format!("missing field `{FIELD_EXPIRES_AT}`"))
        })?;

        let expires_at = raw_expires_at.trim().parse::<i64>().map_err(|_| {
            StorageError::CorruptRecord(format!(
                "field `{FIELD_EXPIRES_AT}` is not an integer: {raw_expires_at}"
            ))
        })?;

        let origin = fields.remove(FIELD_ORIGIN).unwrap_or_default();

        Ok(Some(Self {
            hashed_token,
            origin,
            expires_at,
        }))
    }
}
