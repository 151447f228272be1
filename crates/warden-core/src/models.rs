//! Domain models for Warden.
//!
//! Every tenant-scoped entity carries its `tenant_id`; the Credential Store
//! owns the authoritative copy of all of them.

use serde::{Deserialize, Serialize};

pub mod admin;
pub mod api_resource;
pub mod permission;
pub mod role;
pub mod tenant;
pub mod token;
pub mod user;

/// Enabled/disabled flag shared by tenants, users, roles, permissions and
/// API bindings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Enabled,
    Disabled,
}

impl Status {
    pub fn is_enabled(self) -> bool {
        self == Status::Enabled
    }
}
