//! Cache Layer contract and key namespaces.
//!
//! The cache only holds derived data (permission sets, API binding sets,
//! login codes) plus the token revocation blacklist. Everything but the
//! blacklist can be lost and recomputed.
//!
//! Key prefixes are read by ops tooling and must not change.

use std::time::Duration;

use uuid::Uuid;

use crate::error::WardenResult;

pub const TOKEN_BLACKLIST_PREFIX: &str = "token:blacklist:";
pub const USER_PERMISSION_PREFIX: &str = "user:permission:";
pub const ROLE_PERMISSION_PREFIX: &str = "role:permission:";
pub const API_PERMISSION_PREFIX: &str = "api:permission:";
pub const OTP_PREFIX: &str = "otp:";

/// Lifetime of cached permission-code and permission-id sets.
pub const PERMISSION_SET_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Lifetime of cached API binding sets.
pub const API_BINDING_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub fn token_blacklist_key(jti: &str) -> String {
    format!("{TOKEN_BLACKLIST_PREFIX}{jti}")
}

pub fn user_permission_key(user_id: Uuid, tenant_id: Uuid) -> String {
    format!("{USER_PERMISSION_PREFIX}{user_id}:{tenant_id}")
}

pub fn role_permission_key(role_id: Uuid, tenant_id: Uuid) -> String {
    format!("{ROLE_PERMISSION_PREFIX}{role_id}:{tenant_id}")
}

pub fn api_permission_key(permission_id: Uuid, tenant_id: Uuid) -> String {
    format!("{API_PERMISSION_PREFIX}{permission_id}:{tenant_id}")
}

pub fn otp_key(tenant_id: Uuid, phone: &str) -> String {
    format!("{OTP_PREFIX}{tenant_id}:{phone}")
}

/// A shared key-value cache with string sets and per-key TTLs.
///
/// Every process sharing a deployment must see the same keyspace; reads
/// always go to the store, never to a process-local copy.
pub trait CacheStore: Send + Sync {
    /// Members of the set at `key`. Absent keys yield an empty set.
    fn set_members(&self, key: &str) -> impl Future<Output = WardenResult<Vec<String>>> + Send;

    /// Adds `members` to the set at `key` and (re)sets its TTL in one step.
    fn set_add(
        &self,
        key: &str,
        members: &[String],
        ttl: Duration,
    ) -> impl Future<Output = WardenResult<()>> + Send;

    /// Stores a plain string value with a TTL.
    fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = WardenResult<()>> + Send;

    fn get(&self, key: &str) -> impl Future<Output = WardenResult<Option<String>>> + Send;

    /// Reads and removes a plain string value in one atomic step. Of two
    /// concurrent callers at most one sees the value.
    fn take(&self, key: &str) -> impl Future<Output = WardenResult<Option<String>>> + Send;

    fn exists(&self, key: &str) -> impl Future<Output = WardenResult<bool>> + Send;

    /// Remaining lifetime of `key`; `None` if absent or without expiry.
    fn ttl(&self, key: &str) -> impl Future<Output = WardenResult<Option<Duration>>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = WardenResult<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_namespaces_are_stable() {
        let user = Uuid::nil();
        let tenant = Uuid::from_u128(1);
        assert_eq!(token_blacklist_key("abc"), "token:blacklist:abc");
        assert_eq!(
            user_permission_key(user, tenant),
            format!("user:permission:{user}:{tenant}")
        );
        assert_eq!(
            role_permission_key(user, tenant),
            format!("role:permission:{user}:{tenant}")
        );
        assert_eq!(
            api_permission_key(user, tenant),
            format!("api:permission:{user}:{tenant}")
        );
        assert_eq!(otp_key(tenant, "+15550100"), format!("otp:{tenant}:+15550100"));
    }

    #[test]
    fn api_bindings_outlive_permission_sets() {
        assert_eq!(PERMISSION_SET_TTL.as_secs(), 43_200);
        assert_eq!(API_BINDING_TTL.as_secs(), 86_400);
    }
}
