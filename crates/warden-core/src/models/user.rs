//! Principal (user) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Status;
use super::role::Role;
use crate::patch::Patch;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Fixed at creation; no update path changes it.
    pub tenant_id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Super-admin of its own tenant only.
    pub is_super_admin: bool,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub tenant_id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Argon2id PHC string, hashed by the caller.
    pub password_hash: String,
    pub is_super_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    #[serde(default)]
    pub email: Patch<String>,
    #[serde(default)]
    pub phone: Patch<String>,
    pub password_hash: Option<String>,
    pub is_super_admin: Option<bool>,
    pub status: Option<Status>,
}

/// Role summary embedded in [`UserInfo`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleSummary {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

impl From<&Role> for RoleSummary {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id,
            name: role.name.clone(),
            code: role.code.clone(),
        }
    }
}

/// Projection of a principal returned by login and user-info lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_super_admin: bool,
    pub roles: Vec<RoleSummary>,
}

impl UserInfo {
    pub fn new(user: &User, roles: &[Role]) -> Self {
        Self {
            id: user.id,
            tenant_id: user.tenant_id,
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            is_super_admin: user.is_super_admin,
            roles: roles.iter().map(RoleSummary::from).collect(),
        }
    }
}
