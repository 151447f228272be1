//! One-time login codes for tenants configured for code-based login.
//!
//! Codes live in the Cache Layer under `otp:{tenant}:{phone}` and are
//! consumed by the first verification attempt.

use std::time::Duration;

use subtle::ConstantTimeEq;
use tracing::info;
use uuid::Uuid;
use warden_core::cache::{CacheStore, otp_key};
use warden_core::deadline::with_deadline;
use warden_core::error::{WardenError, WardenResult};

/// Number of digits in a login code.
pub const CODE_LENGTH: usize = 6;

/// Issues and checks login codes.
#[derive(Clone)]
pub struct LoginCodeService<C: CacheStore> {
    cache: C,
    lifetime: Duration,
    deadline: Duration,
}

impl<C: CacheStore> LoginCodeService<C> {
    pub fn new(cache: C, lifetime: Duration, deadline: Duration) -> Self {
        Self {
            cache,
            lifetime,
            deadline,
        }
    }

    /// Generate a fresh code for (tenant, phone), replacing any earlier one.
    ///
    /// Delivery to the phone is the caller's business.
    pub async fn issue(&self, tenant_id: Uuid, phone: &str) -> WardenResult<String> {
        if phone.is_empty() {
            return Err(WardenError::validation("phone is required"));
        }
        let code = generate_code();
        with_deadline(
            self.deadline,
            "login code write",
            self.cache.put(&otp_key(tenant_id, phone), &code, self.lifetime),
        )
        .await?;

        info!(%tenant_id, "login code issued");
        Ok(code)
    }

    /// `true` only if `code` matches the live code for (tenant, phone).
    /// Absent, expired and wrong codes all yield `false`.
    ///
    /// The stored code is removed atomically by the first attempt, right
    /// or wrong, so a code can log in at most once and cannot be guessed
    /// at repeatedly.
    pub async fn verify(&self, tenant_id: Uuid, phone: &str, code: &str) -> WardenResult<bool> {
        let key = otp_key(tenant_id, phone);
        let stored = with_deadline(self.deadline, "login code consume", self.cache.take(&key)).await?;

        Ok(stored.is_some_and(|stored| bool::from(stored.as_bytes().ct_eq(code.as_bytes()))))
    }
}

fn generate_code() -> String {
    let n: u32 = rand::random_range(0..1_000_000);
    format!("{n:0width$}", width = CODE_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
