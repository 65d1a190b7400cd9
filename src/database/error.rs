//! Error types for the moderation store.

use thiserror::Error;

/// Errors surfaced by store operations.
///
/// Guild and registry misses are healed locally (auto-create, seeding), so
/// `NotFound` only reaches callers for targets that cannot be materialized
/// on demand.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Target record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backing store unreachable or the operation failed
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Malformed input rejected before touching the store
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Document could not be converted to or from its stored form
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(error: mongodb::error::Error) -> Self {
        Self::Unavailable(error.to_string())
    }
}

impl From<bson::ser::Error> for StoreError {
    fn from(error: bson::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<bson::de::Error> for StoreError {
    fn from(error: bson::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        Self::Unavailable(error.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Check that an identifier is a numeric snowflake.
///
/// Snowflakes end up inside dotted field paths (`warning_users.<id>.count`),
/// so anything other than ASCII digits is rejected.
pub fn validate_snowflake(field: &'static str, id: &str) -> StoreResult<()> {
    if id.is_empty() {
        return Err(StoreError::validation(field, "must not be empty"));
    }
    if id.len() > 20 {
        return Err(StoreError::validation(field, format!("'{id}' is too long")));
    }
    if !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StoreError::validation(field, format!("'{id}' is not numeric")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = StoreError::NotFound("guild 100".to_string());
        assert_eq!(error.to_string(), "Not found: guild 100");

        let error = StoreError::validation("guild_id", "must not be empty");
        assert_eq!(error.to_string(), "Invalid guild_id: must not be empty");
    }

    #[test]
    fn test_validate_snowflake() {
        assert!(validate_snowflake("guild_id", "100").is_ok());
        assert!(validate_snowflake("guild_id", "1249380931781791855").is_ok());
        assert!(validate_snowflake("guild_id", "").is_err());
        assert!(validate_snowflake("user_id", "12a").is_err());
        assert!(validate_snowflake("user_id", "1.2").is_err());
        assert!(validate_snowflake("user_id", "$where").is_err());
        assert!(validate_snowflake("user_id", "123456789012345678901").is_err());
    }
}
