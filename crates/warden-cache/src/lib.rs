//! Warden Cache: [`CacheStore`](warden_core::cache::CacheStore)
//! implementations.
//!
//! - [`RedisCache`]: the shared store used in deployments.
//! - [`MemoryCache`]: an in-process store for tests and single-node setups.
//!   Its clock is `tokio::time`, so expiry can be driven with paused time.

mod error;
mod memory;
mod redis_store;

pub use error::CacheError;
pub use memory::MemoryCache;
pub use redis_store::{CacheConfig, RedisCache};
