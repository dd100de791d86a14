//! Redis storage backend for passkeep
//!
//! [`RedisTokenStore`] implements [`TokenStore`] over any [`KeyValueBackend`]. With
//! the default [`RedisBackend`] every user's token lives in a Redis hash at
//! `{prefix}{uid}` in the configured logical database.
//!
//! # Writes
//!
//! Storing a token writes the record's fields and then sets the key's expiry,
//! rounded up to whole seconds. The two commands are not atomic: if the expiry
//! fails after the write succeeded the record stays without a store-level TTL and
//! the error is returned. Every read checks the record's own expiry timestamp, so
//! such a record is still refused once it has expired.
//!
//! # Connections
//!
//! A store owns its backend, and with it the connection whose selected database
//! the store relies on. [`RedisTokenStore::connect`] opens a connection per store;
//! stores over a [`MemoryBackend`] share data through
//! [`MemoryBackend::connection`].
//!
//! # Example
//!
//! ```rust,no_run
//! use passkeep_core::TokenStore;
//! use passkeep_storage_redis::{RedisTokenStore, TokenStoreConfig};
//!
//! # async fn example() -> Result<(), passkeep_core::Error> {
//! let config = TokenStoreConfig::builder()
//!     .database_index(1)
//!     .token_key_prefix("login:")
//!     .build()?;
//! let store = RedisTokenStore::connect("redis://127.0.0.1/", config).await?;
//!
//! store
//!     .store_or_update("token", "usr_123", 15 * 60 * 1000, Some("/settings"))
//!     .await?;
//! let authentication = store.authenticate("token", "usr_123").await?;
//! assert!(authentication.is_valid());
//! # Ok(())
//! # }
//! ```
pub mod backend;
pub mod config;
pub mod memory;
pub mod namespace;
pub mod redis_backend;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use passkeep_core::{
    Authentication, Error, TokenCodec, TokenRecord, TokenStore,
    error::StorageError,
    record::FIELD_TOKEN,
    validation::{expiry_timestamp, validate_token, validate_uid},
};

pub use backend::KeyValueBackend;
pub use config::{TokenStoreConfig, TokenStoreConfigBuilder};
pub use memory::MemoryBackend;
pub use namespace::{DEFAULT_TOKEN_KEY_PREFIX, Namespace};
pub use redis_backend::RedisBackend;

pub struct RedisTokenStore<B: KeyValueBackend = RedisBackend> {
    backend: B,
    namespace: Namespace,
    codec: TokenCodec,
    config: TokenStoreConfig,
}

impl RedisTokenStore<RedisBackend> {
    /// Validate `config` and connect to the Redis server at `url`
    ///
    /// An invalid configuration is rejected before any connection is attempted.
    pub async fn connect(url: &str, config: TokenStoreConfig) -> Result<Self, Error> {
        config.validate()?;
        let backend = RedisBackend::connect(url).await?;
        Self::with_backend(backend, config)
    }
}

impl<B: KeyValueBackend> RedisTokenStore<B> {
    pub fn with_backend(backend: B, config: TokenStoreConfig) -> Result<Self, Error> {
        config.validate()?;
        let codec = TokenCodec::new(config.hash_cost)?;
        let namespace = Namespace::new(config.database_index, config.token_key_prefix.clone());

        Ok(Self {
            backend,
            namespace,
            codec,
            config,
        })
    }

    pub fn config(&self) -> &TokenStoreConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Storage key holding the record of `uid`
    pub fn key_for(&self, uid: &str) -> String {
        self.namespace.key(uid)
    }

    /// Whether the configured database has been selected yet
    pub fn is_selected(&self) -> bool {
        self.namespace.is_selected()
    }

    /// Check that the backing store answers
    pub async fn health_check(&self) -> Result<(), Error> {
        self.backend.ping().await?;
        Ok(())
    }

    /// The live record of `uid` when `token` matches it
    async fn verify(&self, token: &str, uid: &str) -> Result<Option<TokenRecord>, Error> {
        validate_token(token)?;
        validate_uid(uid)?;

        self.namespace.ensure_selected(&self.backend).await?;

        let key = self.namespace.key(uid);
        let fields = self.backend.hash_get_all(&key).await?;
        let record = TokenRecord::from_fields(fields).map_err(|e| {
            tracing::error!(error = %e, key = %key, "Stored token record is corrupt");
            e
        })?;

        let Some(record) = record else {
            tracing::debug!(uid = %uid, "No token stored for user");
            return Ok(None);
        };

        if record.is_expired_at(Utc::now().timestamp_millis()) {
            tracing::debug!(uid = %uid, "Stored token has expired");
            return Ok(None);
        }

        if self.codec.compare(token, &record.hashed_token).await? {
            tracing::debug!(uid = %uid, "Token accepted");
            Ok(Some(record))
        } else {
            tracing::debug!(uid = %uid, "Token rejected");
            Ok(None)
        }
    }

    async fn namespace_keys(&self) -> Result<Vec<String>, Error> {
        self.namespace.ensure_selected(&self.backend).await?;
        let keys = self.backend.keys(&self.namespace.pattern()).await?;
        Ok(keys)
    }
}

/// Store-level expiry for a token living `ms_to_live` milliseconds
///
/// Rounded up so the store never evicts a record its timestamp still considers
/// valid.
fn expiry_seconds(ms_to_live: i64) -> u64 {
    u64::try_from(ms_to_live).unwrap_or(0).div_ceil(1000)
}

#[async_trait]
impl<B: KeyValueBackend> TokenStore for RedisTokenStore<B> {
    async fn authenticate(&self, token: &str, uid: &str) -> Result<Authentication, Error> {
        let accepted = self.verify(token, uid).await?;
        Ok(accepted.map_or_else(Authentication::denied, |record| {
            Authentication::granted(record.origin)
        }))
    }

    async fn consume(&self, token: &str, uid: &str) -> Result<Authentication, Error> {
        let Some(record) = self.verify(token, uid).await? else {
            return Ok(Authentication::denied());
        };

        let key = self.namespace.key(uid);
        let removed = self
            .backend
            .compare_and_delete(&key, FIELD_TOKEN, &record.hashed_token)
            .await?;

        if removed {
            tracing::debug!(uid = %uid, "Token consumed");
            Ok(Authentication::granted(record.origin))
        } else {
            tracing::debug!(uid = %uid, "Token was consumed or replaced concurrently");
            Ok(Authentication::denied())
        }
    }

    async fn store_or_update(
        &self,
        token: &str,
        uid: &str,
        ms_to_live: i64,
        origin: Option<&str>,
    ) -> Result<(), Error> {
        validate_token(token)?;
        validate_uid(uid)?;
        expiry_timestamp(Utc::now().timestamp_millis(), ms_to_live)?;

        self.namespace.ensure_selected(&self.backend).await?;

        let hashed_token = self.codec.hash(token).await?;
        let expires_at = expiry_timestamp(Utc::now().timestamp_millis(), ms_to_live)?;
        let record = TokenRecord::new(hashed_token, origin, expires_at);

        let key = self.namespace.key(uid);
        self.backend.hash_set(&key, &record.to_fields()).await?;

        let seconds = expiry_seconds(ms_to_live);
        if let Err(e) = self.backend.expire(&key, seconds).await {
            tracing::warn!(
                error = %e,
                key = %key,
                "Token stored without a store-level expiry"
            );
            return Err(e.into());
        }

        tracing::debug!(uid = %uid, expires_in_secs = seconds, "Stored token");
        Ok(())
    }

    async fn invalidate_user(&self, uid: &str) -> Result<(), Error> {
        validate_uid(uid)?;

        self.namespace.ensure_selected(&self.backend).await?;
        self.backend.delete(&self.namespace.key(uid)).await?;

        tracing::debug!(uid = %uid, "Invalidated token");
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        let keys = self.namespace_keys().await?;
        if keys.is_empty() {
            return Ok(());
        }

        // Every deletion runs to completion; the first failure is reported.
        let results: Vec<Result<(), StorageError>> = stream::iter(keys)
            .map(|key| async move { self.backend.delete(&key).await })
            .buffer_unordered(self.config.clear_concurrency)
            .collect()
            .await;

        let total = results.len();
        let mut failures = results.into_iter().filter_map(Result::err);
        match failures.next() {
            Some(first) => {
                let failed = 1 + failures.count();
                tracing::error!(
                    error = %first,
                    failed,
                    total,
                    prefix = %self.namespace.prefix(),
                    "Failed to clear tokens"
                );
                Err(first.into())
            }
            None => {
                tracing::debug!(count = total, prefix = %self.namespace.prefix(), "Cleared tokens");
                Ok(())
            }
        }
    }

    async fn length(&self) -> Result<usize, Error> {
        Ok(self.namespace_keys().await?.len())
    }
}
