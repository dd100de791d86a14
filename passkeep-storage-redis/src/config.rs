use passkeep_core::{
    DEFAULT_HASH_COST, Error,
    crypto::validate_hash_cost,
    error::ValidationError,
    validation::{parse_database_index, validate_database_index, validate_key_prefix},
};

use crate::namespace::DEFAULT_TOKEN_KEY_PREFIX;

/// Deletions `clear` keeps in flight at once when not configured.
pub const DEFAULT_CLEAR_CONCURRENCY: usize = 16;

/// Configuration for a token store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStoreConfig {
    /// Logical database holding the records.
    /// Default: 0
    pub database_index: u32,

    /// Prefix applied to every record key. Stores sharing a database must use
    /// distinct prefixes.
    /// Default: `"pwdless:"`
    pub token_key_prefix: String,

    /// bcrypt work factor used when hashing tokens.
    /// Default: 10
    pub hash_cost: u32,

    /// Maximum number of deletions `clear` issues concurrently.
    /// Default: 16
    pub clear_concurrency: usize,
}

impl Default for TokenStoreConfig {
    fn default() -> Self {
        Self {
            database_index: 0,
            token_key_prefix: DEFAULT_TOKEN_KEY_PREFIX.to_string(),
            hash_cost: DEFAULT_HASH_COST,
            clear_concurrency: DEFAULT_CLEAR_CONCURRENCY,
        }
    }
}

impl TokenStoreConfig {
    pub fn builder() -> TokenStoreConfigBuilder {
        TokenStoreConfigBuilder::default()
    }

    /// Check every setting, failing on the first invalid one
    pub fn validate(&self) -> Result<(), Error> {
        validate_key_prefix(&self.token_key_prefix)?;
        validate_hash_cost(self.hash_cost)?;
        if self.clear_concurrency == 0 {
            return Err(ValidationError::InvalidField(
                "Clear concurrency must be at least 1".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum DatabaseIndexSetting {
    Number(i64),
    Text(String),
}

/// Builder for [`TokenStoreConfig`]
///
/// Values are checked in [`TokenStoreConfigBuilder::build`], so a database index
/// read from the environment as text is rejected there rather than when it is
/// set.
#[derive(Debug, Clone, Default)]
pub struct TokenStoreConfigBuilder {
    database_index: Option<DatabaseIndexSetting>,
    token_key_prefix: Option<String>,
    hash_cost: Option<u32>,
    clear_concurrency: Option<usize>,
}

impl TokenStoreConfigBuilder {
    pub fn database_index(mut self, index: i64) -> Self {
        self.database_index = Some(DatabaseIndexSetting::Number(index));
        self
    }

    /// Set the database index from text, such as an environment variable
    pub fn database_index_str(mut self, index: impl Into<String>) -> Self {
        self.database_index = Some(DatabaseIndexSetting::Text(index.into()));
        self
    }

    pub fn token_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.token_key_prefix = Some(prefix.into());
        self
    }

    pub fn hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = Some(cost);
        self
    }

    pub fn clear_concurrency(mut self, concurrency: usize) -> Self {
        self.clear_concurrency = Some(concurrency);
        self
    }

    pub fn build(self) -> Result<TokenStoreConfig, Error> {
        let defaults = TokenStoreConfig::default();

        let database_index = match self.database_index {
            Some(DatabaseIndexSetting::Number(index)) => validate_database_index(index)?,
            Some(DatabaseIndexSetting::Text(raw)) => parse_database_index(&raw)?,
            None => defaults.database_index,
        };

        let config = TokenStoreConfig {
            database_index,
            token_key_prefix: self.token_key_prefix.unwrap_or(defaults.token_key_prefix),
            hash_cost: self.hash_cost.unwrap_or(defaults.hash_cost),
            clear_concurrency: self.clear_concurrency.unwrap_or(defaults.clear_concurrency),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use passkeep_core::MIN_HASH_COST;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = TokenStoreConfig::builder().build().unwrap();
        assert_eq!(config, TokenStoreConfig::default());
        assert_eq!(config.database_index, 0);
        assert_eq!(config.token_key_prefix, "pwdless:");
        assert_eq!(config.hash_cost, DEFAULT_HASH_COST);
        assert_eq!(config.clear_concurrency, DEFAULT_CLEAR_CONCURRENCY);
    }

    #[test]
    fn test_custom_values() {
        let config = TokenStoreConfig::builder()
            .database_index(4)
            .token_key_prefix("login:")
            .hash_cost(MIN_HASH_COST)
            .clear_concurrency(2)
            .build()
            .unwrap();

        assert_eq!(config.database_index, 4);
        assert_eq!(config.token_key_prefix, "login:");
        assert_eq!(config.hash_cost, MIN_HASH_COST);
        assert_eq!(config.clear_concurrency, 2);
    }

    #[test]
    fn test_database_index_from_text() {
        let config = TokenStoreConfig::builder()
            .database_index_str("7")
            .build()
            .unwrap();
        assert_eq!(config.database_index, 7);
    }

    #[test]
    fn test_non_numeric_database_index_is_rejected() {
        let result = TokenStoreConfig::builder()
            .database_index_str("primary")
            .build();
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::InvalidDatabaseIndex(_)))
        ));
    }

    #[test]
    fn test_negative_database_index_is_rejected() {
        let result = TokenStoreConfig::builder().database_index(-1).build();
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::InvalidDatabaseIndex(_)))
        ));
    }

    #[test]
    fn test_weak_hash_cost_is_rejected() {
        let result = TokenStoreConfig::builder()
            .hash_cost(MIN_HASH_COST - 1)
            .build();
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::InvalidHashCost(_)))
        ));
    }

    #[test]
    fn test_empty_prefix_is_rejected() {
        let result = TokenStoreConfig::builder().token_key_prefix("").build();
        assert!(result.unwrap_err().is_validation_error());
    }

    #[test]
    fn test_zero_clear_concurrency_is_rejected() {
        let result = TokenStoreConfig::builder().clear_concurrency(0).build();
        assert!(result.unwrap_err().is_validation_error());
    }

    #[test]
    fn test_validate_catches_hand_built_config() {
        let config = TokenStoreConfig {
            hash_cost: 1,
            ..TokenStoreConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
