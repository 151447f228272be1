//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. UUIDs are stored as strings, enums as
//! strings guarded by ASSERT, and login methods as their numeric code.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct AppliedVersion {
    version: u32,
}

/// One forward-only schema step. Versions strictly increase.
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "credential_store",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: credential store tables
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (global scope, soft-deleted)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD description ON TABLE tenant TYPE option<string>;
DEFINE FIELD secret ON TABLE tenant TYPE string;
DEFINE FIELD status ON TABLE tenant TYPE string \
    ASSERT $value IN ['Enabled', 'Disabled'];
DEFINE FIELD login_method ON TABLE tenant TYPE option<int> \
    ASSERT $value = NONE OR $value IN [0, 1];
DEFINE FIELD deleted_at ON TABLE tenant TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_name ON TABLE tenant COLUMNS name UNIQUE;

-- =======================================================================
-- Users (tenant scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user TYPE string;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE option<string>;
DEFINE FIELD phone ON TABLE user TYPE option<string>;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD is_super_admin ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['Enabled', 'Disabled'];
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_tenant_username ON TABLE user \
    COLUMNS tenant_id, username UNIQUE;
DEFINE INDEX idx_user_tenant_email ON TABLE user \
    COLUMNS tenant_id, email;
DEFINE INDEX idx_user_tenant_phone ON TABLE user \
    COLUMNS tenant_id, phone;

-- =======================================================================
-- Roles (tenant scope)
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE role TYPE string;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD code ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE option<string>;
DEFINE FIELD status ON TABLE role TYPE string \
    ASSERT $value IN ['Enabled', 'Disabled'];
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_tenant_code ON TABLE role \
    COLUMNS tenant_id, code UNIQUE;

-- =======================================================================
-- Permissions (tenant scope; codes may repeat)
-- =======================================================================
DEFINE TABLE permission SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE permission TYPE string;
DEFINE FIELD name ON TABLE permission TYPE string;
DEFINE FIELD code ON TABLE permission TYPE string;
DEFINE FIELD resource ON TABLE permission TYPE string;
DEFINE FIELD action ON TABLE permission TYPE string;
DEFINE FIELD description ON TABLE permission TYPE option<string>;
DEFINE FIELD status ON TABLE permission TYPE string \
    ASSERT $value IN ['Enabled', 'Disabled'];
DEFINE FIELD created_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_permission_tenant_code ON TABLE permission \
    COLUMNS tenant_id, code;

-- =======================================================================
-- API bindings (tenant scope)
-- =======================================================================
DEFINE TABLE api_resource SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE api_resource TYPE string;
DEFINE FIELD path ON TABLE api_resource TYPE string;
DEFINE FIELD method ON TABLE api_resource TYPE string;
DEFINE FIELD description ON TABLE api_resource TYPE option<string>;
DEFINE FIELD permission_id ON TABLE api_resource TYPE string;
DEFINE FIELD status ON TABLE api_resource TYPE string \
    ASSERT $value IN ['Enabled', 'Disabled'];
DEFINE FIELD created_at ON TABLE api_resource TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE api_resource TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_api_resource_route ON TABLE api_resource \
    COLUMNS tenant_id, path, method UNIQUE;
DEFINE INDEX idx_api_resource_permission ON TABLE api_resource \
    COLUMNS tenant_id, permission_id;

-- =======================================================================
-- Issued tokens (append-only inventory)
-- =======================================================================
DEFINE TABLE token SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE token TYPE option<string>;
DEFINE FIELD subject_id ON TABLE token TYPE string;
DEFINE FIELD subject_kind ON TABLE token TYPE string \
    ASSERT $value IN ['principal', 'admin'];
DEFINE FIELD jti ON TABLE token TYPE string;
DEFINE FIELD token ON TABLE token TYPE string;
DEFINE FIELD token_type ON TABLE token TYPE string \
    ASSERT $value IN ['access', 'refresh'];
DEFINE FIELD expires_at ON TABLE token TYPE datetime;
DEFINE FIELD created_at ON TABLE token TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_token_jti ON TABLE token COLUMNS jti UNIQUE;
DEFINE INDEX idx_token_subject ON TABLE token \
    COLUMNS subject_kind, subject_id;
DEFINE INDEX idx_token_expiry ON TABLE token COLUMNS expires_at;

-- =======================================================================
-- Administrators (global scope; one record per username)
-- =======================================================================
DEFINE TABLE admin SCHEMAFULL;
DEFINE FIELD username ON TABLE admin TYPE string;
DEFINE FIELD email ON TABLE admin TYPE option<string>;
DEFINE FIELD password_hash ON TABLE admin TYPE string;
DEFINE FIELD scope ON TABLE admin TYPE string \
    ASSERT $value IN ['System', 'App'];
DEFINE FIELD tenant_id ON TABLE admin TYPE option<string>;
DEFINE FIELD is_active ON TABLE admin TYPE bool DEFAULT true;
DEFINE FIELD last_login_at ON TABLE admin TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE admin TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE admin TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_admin_username ON TABLE admin COLUMNS username UNIQUE;
DEFINE INDEX idx_admin_email ON TABLE admin COLUMNS email;

-- =======================================================================
-- Graph Edge Tables (relations). Memberships are sets.
-- =======================================================================

-- User -> Role assignment
DEFINE TABLE has_role TYPE RELATION SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE has_role TYPE string;
DEFINE INDEX idx_has_role_pair ON TABLE has_role COLUMNS in, out UNIQUE;

-- Role -> Permission grants
DEFINE TABLE grants TYPE RELATION SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE grants TYPE string;
DEFINE INDEX idx_grants_pair ON TABLE grants COLUMNS in, out UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

async fn applied_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let rows: Vec<AppliedVersion> = result.take(0)?;
    Ok(rows.first().map(|row| row.version).unwrap_or(0))
}

async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    info!(
        version = migration.version,
        name = migration.name,
        "Applying migration"
    );

    db.query(migration.sql).await?.check().map_err(|e| {
        DbError::Migration(format!(
            "v{} '{}' failed: {e}",
            migration.version, migration.name
        ))
    })?;

    db.query("CREATE _migration SET version = $version, name = $name")
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!("recording v{} failed: {e}", migration.version))
        })?;

    Ok(())
}

/// Brings the store up to the latest schema version.
///
/// Idempotent: already-applied versions (tracked in `_migration`) are
/// skipped, so every process may call it on startup.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let current = applied_version(db).await?;
    let mut applied = 0;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        apply(db, migration).await?;
        applied += 1;
    }

    if applied > 0 {
        info!(applied, "Schema is up to date");
    }
    Ok(())
}

/// Raw DDL of schema version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_strictly_increase() {
        for pair in MIGRATIONS.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
    }

    #[test]
    fn schema_defines_every_store_table() {
        for table in [
            "tenant",
            "user",
            "role",
            "permission",
            "api_resource",
            "token",
            "admin",
            "has_role",
            "grants",
        ] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} ")),
                "missing table {table}"
            );
        }
    }
}
