//! # Passkeep
//!
//! Passkeep stores the short-lived tokens behind passwordless sign-in. A framework
//! emails a user a link carrying a token; passkeep keeps a salted hash of that
//! token next to the page the user was trying to reach, and later tells the
//! framework whether the token presented for a user is still good.
//!
//! Guarantees:
//! - Tokens are hashed with bcrypt before they are stored, salted per call
//! - A user holds at most one token; issuing a new one replaces the old
//! - Expired tokens are refused even before the store evicts them
//! - An unknown user and an expired or wrong token look the same to the caller
//!
//! ## Storage Support
//!
//! - Redis (feature `redis`, enabled by default)
//! - An in-memory store for tests and local development (feature `redis`)
//! - Any other type implementing [`TokenStore`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use passkeep::PasskeepBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let passkeep = PasskeepBuilder::new()
//!         .with_redis("redis://127.0.0.1/")
//!         .await?
//!         .build()?;
//!
//!     let token = passkeep.issue_token("usr_123", Some("/billing")).await?;
//!     // ...deliver the token to the user, then once they follow the link:
//!     let authentication = passkeep.verify_token(&token, "usr_123").await?;
//!     assert_eq!(authentication.origin(), Some("/billing"));
//!     Ok(())
//! }
//! ```
mod builder;

use std::sync::Arc;

use chrono::Duration;

pub use builder::{PasskeepBuilder, PasskeepBuilderError};

/// Re-export core types from passkeep_core
pub use passkeep_core::{
    Authentication, Error, MIN_HASH_COST, TokenCodec, TokenRecord, TokenStore, error,
    generate_secure_token,
};

/// Re-export storage backends
///
/// These storage implementations are available when the corresponding feature is enabled.
#[cfg(feature = "redis")]
pub use passkeep_storage_redis::{
    KeyValueBackend, MemoryBackend, RedisBackend, RedisTokenStore, TokenStoreConfig,
    TokenStoreConfigBuilder,
};

/// Settings for issuing tokens.
#[derive(Debug, Clone)]
pub struct PasskeepConfig {
    /// How long an issued token stays valid.
    /// Default: 15 minutes
    pub expires_in: Duration,
}

impl Default for PasskeepConfig {
    fn default() -> Self {
        Self {
            expires_in: Duration::minutes(15),
        }
    }
}

/// Issues and verifies passwordless tokens against a [`TokenStore`].
///
/// The store is held as a trait object, so any backend can be swapped in without
/// changing callers.
#[derive(Clone)]
pub struct Passkeep {
    store: Arc<dyn TokenStore>,
    config: PasskeepConfig,
}

impl Passkeep {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self::with_config(store, PasskeepConfig::default())
    }

    pub fn with_config(store: Arc<dyn TokenStore>, config: PasskeepConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &PasskeepConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Generate a token for `uid`, store it, and return the plaintext
    ///
    /// Any token `uid` already holds stops working.
    pub async fn issue_token(&self, uid: &str, origin: Option<&str>) -> Result<String, Error> {
        self.issue_token_with_expiration(uid, self.config.expires_in, origin)
            .await
    }

    /// Generate and store a token that expires after `expires_in`
    pub async fn issue_token_with_expiration(
        &self,
        uid: &str,
        expires_in: Duration,
        origin: Option<&str>,
    ) -> Result<String, Error> {
        let token = generate_secure_token();
        self.store
            .store_or_update(&token, uid, expires_in.num_milliseconds(), origin)
            .await?;

        tracing::debug!(uid = %uid, "Issued token");
        Ok(token)
    }

    /// Check a token presented for `uid`
    ///
    /// The token stays valid after a successful check; call
    /// [`Passkeep::revoke`] once the user has been signed in.
    pub async fn verify_token(&self, token: &str, uid: &str) -> Result<Authentication, Error> {
        self.store.authenticate(token, uid).await
    }

    /// Verify a token and revoke it when it is accepted
    ///
    /// Concurrent redemptions of one token accept at most one of them. A rejected
    /// token leaves the stored one usable.
    pub async fn redeem_token(&self, token: &str, uid: &str) -> Result<Authentication, Error> {
        self.store.consume(token, uid).await
    }

    pub async fn revoke(&self, uid: &str) -> Result<(), Error> {
        self.store.invalidate_user(uid).await
    }

    /// Remove every token this instance's store manages
    pub async fn clear(&self) -> Result<(), Error> {
        self.store.clear().await
    }

    /// Upper bound on the number of valid tokens
    pub async fn token_count(&self) -> Result<usize, Error> {
        self.store.length().await
    }
}
