//! Authentication error types.

use thiserror::Error;
use warden_core::error::WardenError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("misconfigured: {0}")]
    Misconfigured(String),
}

impl From<AuthError> for WardenError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => WardenError::InvalidCredentials,
            // The reason stays in our logs; callers only learn the token is bad.
            AuthError::TokenInvalid(reason) => {
                tracing::debug!(%reason, "token rejected");
                WardenError::InvalidToken
            }
            AuthError::Crypto(msg) => WardenError::Crypto(msg),
            AuthError::Misconfigured(msg) => WardenError::Crypto(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_reason_is_not_exposed() {
        let err: WardenError = AuthError::TokenInvalid("ExpiredSignature".into()).into();
        assert!(matches!(err, WardenError::InvalidToken));
        assert_eq!(err.to_string(), "invalid token");
    }
}
