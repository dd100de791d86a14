use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Outcome of checking a token for a user.
///
/// A denied result is the same whether the user never had a token, the token
/// expired, or the token did not match, so callers cannot tell those apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    pub valid: bool,
    pub origin: Option<String>,
}

impl Authentication {
    pub fn granted(origin: String) -> Self {
        Self {
            valid: true,
            origin: Some(origin),
        }
    }

    pub fn denied() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The origin URL replayed on success, `None` when denied.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }
}

/// Storage contract for passwordless login tokens
///
/// A store keeps at most one token per user. Tokens are hashed before they are
/// persisted and carry both a logical expiry, checked on every lookup, and a
/// store-level expiry that eventually evicts them.
///
/// Any backend offering these operations can be handed to the authentication
/// framework in place of another.
#[async_trait]
pub trait TokenStore: Send + Sync + 'static {
    /// Check `token` against the token stored for `uid`
    ///
    /// Returns a denied [`Authentication`] when no token is stored, the stored token
    /// has expired, or it does not match. Errors are reserved for storage and
    /// hashing failures.
    async fn authenticate(&self, token: &str, uid: &str) -> Result<Authentication, Error>;

    /// Authenticate `token` for `uid` and remove it when it is accepted
    ///
    /// The removal only succeeds while the record read is still the one stored, so
    /// of several concurrent calls presenting the same token at most one is
    /// granted. A denied call leaves the stored token in place.
    async fn consume(&self, token: &str, uid: &str) -> Result<Authentication, Error>;

    /// Store `token` for `uid`, replacing any token the user already holds
    ///
    /// `ms_to_live` must be positive. `origin` is replayed by a later successful
    /// [`TokenStore::authenticate`] and defaults to the empty string.
    async fn store_or_update(
        &self,
        token: &str,
        uid: &str,
        ms_to_live: i64,
        origin: Option<&str>,
    ) -> Result<(), Error>;

    /// Remove the token stored for `uid`, succeeding when there is none
    async fn invalidate_user(&self, uid: &str) -> Result<(), Error>;

    /// Remove every token in this store's namespace
    async fn clear(&self) -> Result<(), Error>;

    /// Number of records in this store's namespace
    ///
    /// Records that have logically expired but not yet been evicted are counted, so
    /// this is an upper bound on the number of valid tokens.
    async fn length(&self) -> Result<usize, Error>;
}
