//! Administrator domain model.
//!
//! Administrators are distinct from tenant principals. A username belongs to
//! at most one administrator across the whole system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::patch::Patch;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AdminScope {
    /// Global visibility, bound to no tenant.
    System,
    /// Bound to exactly one tenant.
    App(Uuid),
}

impl AdminScope {
    pub fn tenant_id(self) -> Option<Uuid> {
        match self {
            AdminScope::System => None,
            AdminScope::App(tenant_id) => Some(tenant_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub scope: AdminScope,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAdmin {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub scope: AdminScope,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateAdmin {
    #[serde(default)]
    pub email: Patch<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
}
