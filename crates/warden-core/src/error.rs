//! Error types for the Warden system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WardenError {
    /// Authentication failed. Never says which factor was wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Signature, algorithm, structure or expiry failure.
    #[error("invalid token")]
    InvalidToken,

    #[error("tenant is missing or disabled")]
    TenantUnavailable,

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    Conflict { entity: String },

    /// Store or cache unavailable or past its deadline. Safe to retry.
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Only transient failures may be retried; everything else is a
    /// terminal answer for the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

pub type WardenResult<T> = Result<T, WardenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_is_retryable() {
        assert!(WardenError::Transient("redis down".into()).is_retryable());
        assert!(!WardenError::InvalidCredentials.is_retryable());
        assert!(!WardenError::forbidden("wrong tenant").is_retryable());
    }

    #[test]
    fn credential_errors_do_not_leak_detail() {
        assert_eq!(WardenError::InvalidCredentials.to_string(), "invalid credentials");
        assert_eq!(WardenError::InvalidToken.to_string(), "invalid token");
    }
}
