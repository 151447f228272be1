//! Issued-token records.
//!
//! Every issued token is persisted for inventory. Records are append-only;
//! superseded tokens stay until they are purged after expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Who a token speaks for. Principal-facing and admin validation each
/// reject the other kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Principal,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: Uuid,
    /// `None` for system administrators, who belong to no tenant.
    pub tenant_id: Option<Uuid>,
    pub subject_id: Uuid,
    pub subject_kind: SubjectKind,
    pub jti: String,
    pub token: String,
    pub token_type: TokenType,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTokenRecord {
    pub tenant_id: Option<Uuid>,
    pub subject_id: Uuid,
    pub subject_kind: SubjectKind,
    pub jti: String,
    pub token: String,
    pub token_type: TokenType,
    pub expires_at: DateTime<Utc>,
}
