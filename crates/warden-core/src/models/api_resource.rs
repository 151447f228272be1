//! API binding domain model: an HTTP `(path, method)` pair guarded by
//! exactly one permission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Status;
use crate::patch::Patch;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResource {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub path: String,
    /// Upper-case HTTP method.
    pub method: String,
    pub description: Option<String>,
    pub permission_id: Uuid,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiResource {
    /// Composite `path:method` key used by API permission checks.
    pub fn binding_key(&self) -> String {
        binding_key(&self.path, &self.method)
    }
}

pub fn binding_key(path: &str, method: &str) -> String {
    format!("{path}:{method}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApiResource {
    pub tenant_id: Uuid,
    pub path: String,
    pub method: String,
    pub description: Option<String>,
    pub permission_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateApiResource {
    pub path: Option<String>,
    pub method: Option<String>,
    #[serde(default)]
    pub description: Patch<String>,
    pub permission_id: Option<Uuid>,
    pub status: Option<Status>,
}
