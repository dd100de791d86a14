//! Token hashing and verification
//!
//! Tokens are never persisted in plaintext. Before a token reaches the store it is
//! hashed with bcrypt, which salts every call with fresh randomness and lets the
//! caller choose an adaptive work factor. Verification delegates to bcrypt's own
//! comparison, which checks digests in constant time so response latency does not
//! reveal how much of a candidate matched.
//!
//! # Security
//!
//! The work factor is a security parameter, not a tuning knob. A cost below
//! [`MIN_HASH_COST`] is rejected with a validation error rather than silently
//! raised to the minimum.
//!
//! bcrypt is CPU bound. Both [`hash_token`] and [`verify_token`] move the work onto
//! tokio's blocking pool so that async worker threads keep serving other requests
//! while a hash is computed.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::RngCore;

use crate::{
    Error,
    error::{CryptoError, ValidationError},
};

/// Lowest accepted bcrypt work factor.
pub const MIN_HASH_COST: u32 = 4;

/// Highest work factor bcrypt supports.
pub const MAX_HASH_COST: u32 = 31;

/// Work factor used when none is configured.
pub const DEFAULT_HASH_COST: u32 = 10;

/// Generate a cryptographically secure random token.
///
/// This produces a 256-bit (32-byte) random token encoded as URL-safe base64.
/// The token has sufficient entropy for passwordless login links.
///
/// # Returns
///
/// A URL-safe base64-encoded random token (43 characters)
pub fn generate_secure_token() -> String {
    let mut bytes = [0u8; 32]; // 256 bits of entropy
    rand::rng().fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Check that a bcrypt work factor is within the accepted range.
pub fn validate_hash_cost(cost: u32) -> Result<(), ValidationError> {
    if cost < MIN_HASH_COST {
        return Err(ValidationError::InvalidHashCost(format!(
            "cost {cost} is below the minimum of {MIN_HASH_COST}"
        )));
    }

    if cost > MAX_HASH_COST {
        return Err(ValidationError::InvalidHashCost(format!(
            "cost {cost} is above the maximum of {MAX_HASH_COST}"
        )));
    }

    Ok(())
}

/// Hash a token for storage.
///
/// Every call draws a fresh salt, so hashing the same token twice yields two
/// different strings.
///
/// # Arguments
///
/// * `token` - The plaintext token to hash
/// * `cost` - The bcrypt work factor, at least [`MIN_HASH_COST`]
///
/// # Errors
///
/// Returns a validation error for an out-of-range cost and a crypto error when
/// bcrypt or the blocking task fails.
pub async fn hash_token(token: &str, cost: u32) -> Result<String, Error> {
    validate_hash_cost(cost)?;

    let token = token.to_owned();
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(token, cost))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Token hashing task failed");
            CryptoError::Task("token hashing task did not complete".to_string())
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to hash token");
            CryptoError::Hash(e.to_string())
        })?;

    Ok(hashed)
}

/// Verify a plaintext token against a stored bcrypt hash.
///
/// # Returns
///
/// `true` if the token produced the hash, `false` otherwise
///
/// # Errors
///
/// Returns a crypto error when the stored hash is malformed or the blocking task
/// fails.
pub async fn verify_token(token: &str, hashed: &str) -> Result<bool, Error> {
    let token = token.to_owned();
    let hashed = hashed.to_owned();
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(token, &hashed))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Token verification task failed");
            CryptoError::Task("token verification task did not complete".to_string())
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to verify token");
            CryptoError::Verify(e.to_string())
        })?;

    Ok(matches)
}

/// Hashes and compares tokens at a fixed, validated work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenCodec {
    cost: u32,
}

impl TokenCodec {
    /// Create a codec, rejecting a work factor outside the accepted range.
    pub fn new(cost: u32) -> Result<Self, ValidationError> {
        validate_hash_cost(cost)?;
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub async fn hash(&self, token: &str) -> Result<String, Error> {
        hash_token(token, self.cost).await
    }

    pub async fn compare(&self, token: &str, hashed: &str) -> Result<bool, Error> {
        verify_token(token, hashed).await
    }
}

impl Default for TokenCodec {
    fn default() -> Self {
        Self {
            cost: DEFAULT_HASH_COST,
        }
    }
}
