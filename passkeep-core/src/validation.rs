//! Argument validation for token store operations
//!
//! Every public operation checks its arguments here before touching the store, so
//! programmer errors surface as [`ValidationError`]s without any I/O.

use crate::error::ValidationError;

/// Validates a plaintext token
///
/// # Examples
///
/// ```rust
/// use passkeep_core::validation::validate_token;
///
/// assert!(validate_token("c2VjcmV0").is_ok());
/// assert!(validate_token("").is_err());
/// ```
pub fn validate_token(token: &str) -> Result<(), ValidationError> {
    if token.is_empty() {
        return Err(ValidationError::MissingField(
            "Token is required".to_string(),
        ));
    }

    Ok(())
}

/// Validates a user identifier
///
/// # Examples
///
/// ```rust
/// use passkeep_core::validation::validate_uid;
///
/// assert!(validate_uid("usr_123").is_ok());
/// assert!(validate_uid("").is_err());
/// ```
pub fn validate_uid(uid: &str) -> Result<(), ValidationError> {
    if uid.is_empty() {
        return Err(ValidationError::MissingField("UID is required".to_string()));
    }

    Ok(())
}

/// Validates a token time to live in milliseconds
///
/// The value must be positive. An `i64` is accepted so that values computed by
/// callers (for example from a `chrono::Duration`) are checked rather than wrapped.
pub fn validate_ms_to_live(ms_to_live: i64) -> Result<(), ValidationError> {
    if ms_to_live <= 0 {
        return Err(ValidationError::InvalidTimeToLive(format!(
            "{ms_to_live}ms is not a positive duration"
        )));
    }

    Ok(())
}

/// Absolute expiry in epoch milliseconds of a token living `ms_to_live` from `now_ms`
///
/// Rejects a non-positive lifetime, and one so long that the timestamp would
/// overflow.
///
/// # Examples
///
/// ```rust
/// use passkeep_core::validation::expiry_timestamp;
///
/// assert_eq!(expiry_timestamp(1_000, 500).unwrap(), 1_500);
/// assert!(expiry_timestamp(1_000, i64::MAX).is_err());
/// ```
pub fn expiry_timestamp(now_ms: i64, ms_to_live: i64) -> Result<i64, ValidationError> {
    validate_ms_to_live(ms_to_live)?;
    now_ms.checked_add(ms_to_live).ok_or_else(|| {
        ValidationError::InvalidTimeToLive(format!(
            "{ms_to_live}ms overflows the expiry timestamp"
        ))
    })
}

/// Validates a key prefix
pub fn validate_key_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.is_empty() {
        return Err(ValidationError::InvalidField(
            "Token key prefix cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Parses a database index from its textual form
///
/// Indices come from configuration files and environment variables as strings, so
/// this is where a non-numeric or negative value is rejected.
///
/// # Examples
///
/// ```rust
/// use passkeep_core::validation::parse_database_index;
///
/// assert_eq!(parse_database_index("3").unwrap(), 3);
/// assert!(parse_database_index("three").is_err());
/// assert!(parse_database_index("-1").is_err());
/// ```
pub fn parse_database_index(raw: &str) -> Result<u32, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidDatabaseIndex(
            "Database index cannot be empty".to_string(),
        ));
    }

    let index: i64 = trimmed.parse().map_err(|_| {
        ValidationError::InvalidDatabaseIndex(format!("'{raw}' is not a number"))
    })?;

    validate_database_index(index)
}

/// Validates a numeric database index
pub fn validate_database_index(index: i64) -> Result<u32, ValidationError> {
    u32::try_from(index).map_err(|_| {
        ValidationError::InvalidDatabaseIndex(format!(
            "{index} is not a non-negative database index"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_token() {
        assert!(validate_token("abc").is_ok());
        assert!(matches!(
            validate_token(""),
            Err(ValidationError::MissingField(_))
        ));
    }

    #[test]
    fn test_validate_uid() {
        assert!(validate_uid("42").is_ok());
        assert!(matches!(
            validate_uid(""),
            Err(ValidationError::MissingField(_))
        ));
    }

    #[test]
    fn test_validate_ms_to_live() {
        assert!(validate_ms_to_live(1).is_ok());
        assert!(validate_ms_to_live(60_000).is_ok());
        assert!(validate_ms_to_live(0).is_err());
        assert!(validate_ms_to_live(-100).is_err());
    }

    #[test]
    fn test_expiry_timestamp() {
        assert_eq!(expiry_timestamp(10_000, 2_500).unwrap(), 12_500);
        assert!(matches!(
            expiry_timestamp(10_000, 0),
            Err(ValidationError::InvalidTimeToLive(_))
        ));
        assert!(matches!(
            expiry_timestamp(1, i64::MAX),
            Err(ValidationError::InvalidTimeToLive(_))
        ));
        assert_eq!(expiry_timestamp(0, i64::MAX).unwrap(), i64::MAX);
    }

    #[test]
    fn test_validate_key_prefix() {
        assert!(validate_key_prefix("pwdless:").is_ok());
        assert!(validate_key_prefix("").is_err());
    }

    #[test]
    fn test_parse_database_index() {
        assert_eq!(parse_database_index("0").unwrap(), 0);
        assert_eq!(parse_database_index(" 15 ").unwrap(), 15);
        assert!(parse_database_index("").is_err());
        assert!(parse_database_index("1.5").is_err());
        assert!(parse_database_index("db1").is_err());
        assert!(parse_database_index("-2").is_err());
    }

    #[test]
    fn test_validate_database_index() {
        assert_eq!(validate_database_index(7).unwrap(), 7);
        assert!(validate_database_index(-1).is_err());
        assert!(validate_database_index(i64::from(u32::MAX) + 1).is_err());
    }
}
