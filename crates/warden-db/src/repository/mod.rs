//! SurrealDB repository implementations.

mod admin;
mod api_resource;
mod permission;
mod role;
mod tenant;
mod token;
mod user;

pub use admin::SurrealAdminRepository;
pub use api_resource::SurrealApiResourceRepository;
pub use permission::SurrealPermissionRepository;
pub use role::SurrealRoleRepository;
pub use tenant::SurrealTenantRepository;
pub use token::SurrealTokenRepository;
pub use user::SurrealUserRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::models::Status;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(entity: &'static str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Corrupt {
        entity,
        message: format!("invalid UUID {value:?}: {e}"),
    })
}

fn parse_status(entity: &'static str, value: &str) -> Result<Status, DbError> {
    match value {
        "Enabled" => Ok(Status::Enabled),
        "Disabled" => Ok(Status::Disabled),
        other => Err(DbError::Corrupt {
            entity,
            message: format!("unknown status: {other}"),
        }),
    }
}

fn status_str(status: Status) -> &'static str {
    match status {
        Status::Enabled => "Enabled",
        Status::Disabled => "Disabled",
    }
}

fn uuid_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}
