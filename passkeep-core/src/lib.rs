//! Core functionality for the passkeep project
//!
//! This crate contains the pieces shared by every passkeep storage backend: the
//! [`TokenStore`] contract consumed by passwordless authentication frameworks, the
//! persisted [`TokenRecord`], the bcrypt based [`TokenCodec`], argument validation
//! and the error types.
//!
//! The core crate does not talk to any store itself. See `passkeep-storage-redis` for
//! a backend.
//!
pub mod crypto;
pub mod error;
pub mod record;
pub mod store;
pub mod validation;

pub use crypto::{DEFAULT_HASH_COST, MIN_HASH_COST, TokenCodec, generate_secure_token};
pub use error::Error;
pub use record::TokenRecord;
pub use store::{Authentication, TokenStore};
