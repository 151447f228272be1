//! Warden server entry point.

use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use warden_cache::RedisCache;
use warden_db::DbManager;

use warden_server::{AppContext, ServerConfig, ServerError};

/// How often expired token records are swept from the inventory.
const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warden=info,info")),
        )
        .json()
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "Warden server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    info!("Starting Warden server...");

    let config = ServerConfig::from_env()?;
    let db = DbManager::connect(&config.db).await?;
    let cache = RedisCache::connect(&config.cache).await?;
    let ctx = AppContext::new(&config.auth, db.client().clone(), cache);

    // Startup sweep doubles as a liveness check of the token store.
    ctx.tokens.purge_expired(chrono::Duration::zero()).await?;

    let mut sweep = tokio::time::interval(PURGE_INTERVAL);
    sweep.tick().await;

    info!("Warden server ready");
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            _ = sweep.tick() => {
                if let Err(e) = ctx.tokens.purge_expired(chrono::Duration::zero()).await {
                    error!(error = %e, retryable = e.is_retryable(), "token purge failed");
                }
            }
        }
    }

    info!("Warden server stopped.");
    Ok(())
}
