//! Authentication configuration.

use std::time::Duration;

use warden_core::error::{WardenError, WardenResult};

use crate::error::AuthError;

/// Configuration for the token engine and the directory services.
///
/// Built once at process start and handed to each service constructor.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for access tokens.
    pub access_secret: String,
    /// HMAC secret for refresh tokens. Must differ from `access_secret`.
    pub refresh_secret: String,
    /// Access token lifetime in seconds (default: 3600 = 1 hour).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 7200 = 2 hours).
    pub refresh_token_lifetime_secs: u64,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Minimum password length for registration.
    pub min_password_length: usize,
    /// Login code lifetime in seconds (default: 300 = 5 minutes).
    pub login_code_lifetime_secs: u64,
    /// Deadline for every Credential Store and Cache Layer call.
    pub io_deadline_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            refresh_secret: String::new(),
            access_token_lifetime_secs: 3600,
            refresh_token_lifetime_secs: 7200,
            jwt_issuer: "auth-center".into(),
            pepper: None,
            min_password_length: 6,
            login_code_lifetime_secs: 300,
            io_deadline_ms: 3000,
        }
    }
}

impl AuthConfig {
    /// Rejects configurations the token engine cannot sign with.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            return Err(AuthError::Misconfigured(
                "access and refresh signing secrets must be set".into(),
            ));
        }
        if self.access_secret == self.refresh_secret {
            return Err(AuthError::Misconfigured(
                "access and refresh signing secrets must differ".into(),
            ));
        }
        if self.access_token_lifetime_secs == 0 || self.refresh_token_lifetime_secs == 0 {
            return Err(AuthError::Misconfigured(
                "token lifetimes must be positive".into(),
            ));
        }
        if self.io_deadline_ms == 0 {
            return Err(AuthError::Misconfigured("I/O deadline must be positive".into()));
        }
        Ok(())
    }

    pub fn io_deadline(&self) -> Duration {
        Duration::from_millis(self.io_deadline_ms)
    }

    pub fn access_token_lifetime(&self) -> Duration {
        Duration::from_secs(self.access_token_lifetime_secs)
    }

    pub fn refresh_token_lifetime(&self) -> Duration {
        Duration::from_secs(self.refresh_token_lifetime_secs)
    }

    pub fn login_code_lifetime(&self) -> Duration {
        Duration::from_secs(self.login_code_lifetime_secs)
    }

    /// Length is counted in characters, not bytes.
    pub fn check_password_length(&self, password: &str) -> WardenResult<()> {
        if password.chars().count() < self.min_password_length {
            return Err(WardenError::validation(format!(
                "password must be at least {} characters",
                self.min_password_length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> AuthConfig {
        AuthConfig {
            access_secret: "access-secret".into(),
            refresh_secret: "refresh-secret".into(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_match_deployment_values() {
        let config = AuthConfig::default();
        assert_eq!(config.access_token_lifetime_secs, 3600);
        assert_eq!(config.refresh_token_lifetime_secs, 7200);
        assert_eq!(config.jwt_issuer, "auth-center");
        assert_eq!(config.min_password_length, 6);
    }

    #[test]
    fn missing_secrets_are_rejected() {
        assert!(AuthConfig::default().validate().is_err());
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn shared_secret_is_rejected() {
        let config = AuthConfig {
            refresh_secret: "access-secret".into(),
            ..configured()
        };
        assert!(matches!(config.validate(), Err(AuthError::Misconfigured(_))));
    }

    #[test]
    fn password_length_counts_characters() {
        let config = AuthConfig::default();
        assert!(config.check_password_length("pässwö").is_ok());
        assert!(matches!(
            config.check_password_length("pässw"),
            Err(WardenError::Validation { .. })
        ));
    }
}
