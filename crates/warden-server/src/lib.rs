//! Warden server: configuration, startup errors and the service graph.

pub mod config;
pub mod context;
pub mod error;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::ServerError;
