use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Database selection failed: {0}")]
    Select(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid time to live: {0}")]
    InvalidTimeToLive(String),

    #[error("Invalid database index: {0}")]
    InvalidDatabaseIndex(String),

    #[error("Invalid hash cost: {0}")]
    InvalidHashCost(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Token hashing failed: {0}")]
    Hash(String),

    #[error("Token verification failed: {0}")]
    Verify(String),

    #[error("Blocking task failed: {0}")]
    Task(String),
}

impl Error {
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_crypto_error(&self) -> bool {
        matches!(self, Error::Crypto(_))
    }
}
