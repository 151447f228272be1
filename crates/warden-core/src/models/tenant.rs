//! Tenant (application) domain model.
//!
//! Tenants provide full data isolation: every principal, role, permission
//! and API binding belongs to exactly one tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Status;
use crate::patch::Patch;

/// How principals of a tenant prove their identity.
///
/// Persisted as its numeric code: `0` for password, `1` for one-time code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LoginMethod {
    #[default]
    Password,
    Code,
}

impl LoginMethod {
    pub fn code(self) -> i64 {
        match self {
            LoginMethod::Password => 0,
            LoginMethod::Code => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(LoginMethod::Password),
            1 => Some(LoginMethod::Code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    /// Human-readable name, unique across live tenants.
    pub name: String,
    pub description: Option<String>,
    /// Shared secret presented alongside the tenant id. Rotatable.
    #[serde(skip_serializing)]
    pub secret: String,
    pub status: Status,
    /// `None` means the tenant never configured one; logins use passwords.
    pub login_method: Option<LoginMethod>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn effective_login_method(&self) -> LoginMethod {
        self.login_method.unwrap_or_default()
    }

    pub fn is_available(&self) -> bool {
        self.status.is_enabled() && self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub name: String,
    pub description: Option<String>,
    pub login_method: Option<LoginMethod>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTenant {
    pub name: Option<String>,
    #[serde(default)]
    pub description: Patch<String>,
    pub status: Option<Status>,
    #[serde(default)]
    pub login_method: Patch<LoginMethod>,
}
