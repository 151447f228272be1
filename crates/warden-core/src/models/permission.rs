//! Permission domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Status;
use crate::patch::Patch;

/// A named, authorizable action on a resource type.
///
/// Codes are not unique: several permissions may share one code across
/// different resource/action pairs. Checks match on the code string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// Matched verbatim by permission checks (e.g. `doc:write`).
    pub code: String,
    /// Resource type (e.g. `doc`).
    pub resource: String,
    /// Action verb (e.g. `write`).
    pub action: String,
    pub description: Option<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub tenant_id: Uuid,
    pub name: String,
    pub code: String,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePermission {
    pub name: Option<String>,
    pub code: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
    #[serde(default)]
    pub description: Patch<String>,
    pub status: Option<Status>,
}
