//! Builder pattern for constructing Passkeep instances
//!
//! # Example
//!
//! ```rust,no_run
//! use passkeep::{PasskeepBuilder, TokenStoreConfig};
//! use chrono::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TokenStoreConfig::builder()
//!         .database_index_str(std::env::var("TOKEN_DB").unwrap_or_else(|_| "0".into()))
//!         .build()?;
//!
//!     let passkeep = PasskeepBuilder::new()
//!         .with_store_config(config)
//!         .with_redis("redis://127.0.0.1/")
//!         .await?
//!         .expires_in(Duration::minutes(10))
//!         .build()?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use chrono::Duration;
use passkeep_core::TokenStore;

#[cfg(feature = "redis")]
use passkeep_storage_redis::{MemoryBackend, RedisTokenStore, TokenStoreConfig};

use crate::{Passkeep, PasskeepConfig};

/// Errors that can occur when building a Passkeep instance.
#[derive(Debug, thiserror::Error)]
pub enum PasskeepBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No token store was configured
    #[error("No token store configured")]
    MissingStore,
}

impl From<passkeep_core::Error> for PasskeepBuilderError {
    fn from(error: passkeep_core::Error) -> Self {
        if error.is_validation_error() {
            PasskeepBuilderError::InvalidConfiguration(error.to_string())
        } else {
            PasskeepBuilderError::StorageConnection(error.to_string())
        }
    }
}

/// Builder for [`Passkeep`]
#[derive(Default)]
pub struct PasskeepBuilder {
    store: Option<Arc<dyn TokenStore>>,
    #[cfg(feature = "redis")]
    store_config: Option<TokenStoreConfig>,
    #[cfg(feature = "redis")]
    late_store_config: bool,
    expires_in: Option<Duration>,
}

impl PasskeepBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an already constructed token store
    pub fn with_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Configuration applied to stores created by this builder
    ///
    /// Must be set before [`PasskeepBuilder::with_redis`] or
    /// [`PasskeepBuilder::with_memory_store`]; set after a store exists, it makes
    /// [`PasskeepBuilder::build`] fail.
    #[cfg(feature = "redis")]
    pub fn with_store_config(mut self, config: TokenStoreConfig) -> Self {
        if self.store.is_some() {
            self.late_store_config = true;
        }
        self.store_config = Some(config);
        self
    }

    /// Connect to Redis at `url`
    #[cfg(feature = "redis")]
    pub async fn with_redis(mut self, url: &str) -> Result<Self, PasskeepBuilderError> {
        let config = self.store_config.clone().unwrap_or_default();
        let store = RedisTokenStore::connect(url, config).await?;
        self.store = Some(Arc::new(store));
        Ok(self)
    }

    /// Keep tokens in process memory
    #[cfg(feature = "redis")]
    pub fn with_memory_store(mut self) -> Result<Self, PasskeepBuilderError> {
        let config = self.store_config.clone().unwrap_or_default();
        let store = RedisTokenStore::with_backend(MemoryBackend::new(), config)?;
        self.store = Some(Arc::new(store));
        Ok(self)
    }

    /// How long issued tokens stay valid
    pub fn expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    pub fn build(self) -> Result<Passkeep, PasskeepBuilderError> {
        #[cfg(feature = "redis")]
        if self.late_store_config {
            return Err(PasskeepBuilderError::InvalidConfiguration(
                "Store configuration was set after the store was created".to_string(),
            ));
        }

        let store = self.store.ok_or(PasskeepBuilderError::MissingStore)?;

        let mut config = PasskeepConfig::default();
        if let Some(expires_in) = self.expires_in {
            if expires_in <= Duration::zero() {
                return Err(PasskeepBuilderError::InvalidConfiguration(
                    "Token expiration must be positive".to_string(),
                ));
            }
            config.expires_in = expires_in;
        }

        Ok(Passkeep::with_config(store, config))
    }
}
