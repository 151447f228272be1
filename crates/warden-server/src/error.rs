//! Startup failures.

use warden_auth::AuthError;
use warden_cache::CacheError;
use warden_core::error::WardenError;
use warden_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Service(#[from] WardenError),

    #[error("Signal handler error: {0}")]
    Signal(#[from] std::io::Error),
}
