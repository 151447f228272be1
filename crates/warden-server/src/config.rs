//! Process configuration read from the environment.

use std::env;
use std::str::FromStr;

use warden_auth::AuthConfig;
use warden_cache::CacheConfig;
use warden_db::DbConfig;

use crate::error::ServerError;

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub auth: AuthConfig,
    pub db: DbConfig,
    pub cache: CacheConfig,
}

impl ServerConfig {
    /// Unset variables keep their defaults; the signing secrets have none.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let mut config = Self::default();

        if let Some(secret) = lookup("JWT_SECRET_KEY") {
            config.auth.access_secret = secret;
        }
        if let Some(secret) = lookup("JWT_REFRESH_SECRET_KEY") {
            config.auth.refresh_secret = secret;
        }
        if let Some(ttl) = parsed(&lookup, "JWT_TTL")? {
            config.auth.access_token_lifetime_secs = ttl;
        }
        if let Some(ttl) = parsed(&lookup, "JWT_REFRESH_TTL")? {
            config.auth.refresh_token_lifetime_secs = ttl;
        }
        config.auth.pepper = lookup("PASSWORD_PEPPER");

        if let Some(url) = lookup("DB_URL") {
            config.db.url = url;
        }
        if let Some(namespace) = lookup("DB_NAMESPACE") {
            config.db.namespace = namespace;
        }
        if let Some(database) = lookup("DB_DATABASE") {
            config.db.database = database;
        }
        if let Some(user) = lookup("DB_USER") {
            config.db.username = user;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            config.db.password = password;
        }

        if let Some(url) = lookup("REDIS_URL") {
            config.cache.url = url;
        }

        config.auth.validate()?;
        Ok(config)
    }
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ServerError> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ServerError::Config(format!("{key} is not a valid number: {raw}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, ServerError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn reads_secrets_and_overrides() {
        let config = config_from(&[
            ("JWT_SECRET_KEY", "access"),
            ("JWT_REFRESH_SECRET_KEY", "refresh"),
            ("JWT_TTL", "900"),
            ("DB_URL", "db:8000"),
            ("REDIS_URL", "redis://cache:6379/1"),
        ])
        .unwrap();

        assert_eq!(config.auth.access_token_lifetime_secs, 900);
        assert_eq!(config.auth.refresh_token_lifetime_secs, 7200);
        assert_eq!(config.db.url, "db:8000");
        assert_eq!(config.db.namespace, "warden");
        assert_eq!(config.cache.url, "redis://cache:6379/1");
    }

    #[test]
    fn missing_secrets_are_fatal() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ServerError::Auth(_)));
    }

    #[test]
    fn bad_ttl_is_fatal() {
        let err = config_from(&[
            ("JWT_SECRET_KEY", "access"),
            ("JWT_REFRESH_SECRET_KEY", "refresh"),
            ("JWT_TTL", "an hour"),
        ])
        .unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
