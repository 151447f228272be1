//! SurrealDB implementation of [`RoleRepository`].
//!
//! User-role assignments are `has_role` edges (`user -> has_role -> role`)
//! stamped with the tenant. A unique index on `(in, out)` makes each
//! membership a set element.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::role::{CreateRole, Role, UpdateRole};
use warden_core::repository::{PaginatedResult, Pagination, RoleRepository};

use super::{CountRow, parse_status, parse_uuid, status_str, uuid_strings};
use crate::error::DbError;

const ENTITY: &str = "role";

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct RoleRow {
    tenant_id: String,
    name: String,
    code: String,
    description: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct RoleRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    code: String,
    description: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_role(self, id: Uuid) -> Result<Role, DbError> {
        Ok(Role {
            id,
            tenant_id: parse_uuid(ENTITY, &self.tenant_id)?,
            name: self.name,
            code: self.code,
            description: self.description,
            status: parse_status(ENTITY, &self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl RoleRowWithId {
    fn try_into_role(self) -> Result<Role, DbError> {
        let id = parse_uuid(ENTITY, &self.record_id)?;
        RoleRow {
            tenant_id: self.tenant_id,
            name: self.name,
            code: self.code,
            description: self.description,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_role(id)
    }
}

fn first_role(rows: Vec<RoleRow>, id: Uuid) -> Result<Role, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found(ENTITY, id))?
        .into_role(id)
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Both endpoints of an assignment must live in `tenant_id`.
    async fn ensure_in_tenant(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), DbError> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE meta::id(id) FROM type::record('user', $user_id) \
                 WHERE tenant_id = $tenant_id; \
                 SELECT VALUE meta::id(id) FROM type::record('role', $role_id) \
                 WHERE tenant_id = $tenant_id;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await?;

        let users: Vec<String> = result.take(0)?;
        if users.is_empty() {
            return Err(DbError::not_found("user", user_id));
        }
        let roles: Vec<String> = result.take(1)?;
        if roles.is_empty() {
            return Err(DbError::not_found(ENTITY, role_id));
        }
        Ok(())
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> WardenResult<Role> {
        let id = Uuid::new_v4();

        let result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 tenant_id = $tenant_id, name = $name, code = $code, \
                 description = $description, status = 'Enabled'",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("code", input.code))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;
        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_role(rows, id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> WardenResult<Role> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('role', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_role(rows, id)?)
    }

    async fn get_many(&self, tenant_id: Uuid, ids: &[Uuid]) -> WardenResult<Vec<Role>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE tenant_id = $tenant_id AND status = 'Enabled' \
                 AND meta::id(id) IN $ids \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("ids", uuid_strings(ids)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_role())
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn update(&self, tenant_id: Uuid, id: Uuid, input: UpdateRole) -> WardenResult<Role> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.code.is_some() {
            sets.push("code = $code");
        }
        if !input.description.is_unchanged() {
            sets.push("description = $description");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('role', $id) SET {} \
             WHERE tenant_id = $tenant_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(code) = input.code {
            builder = builder.bind(("code", code));
        }
        if let Some(description) = input.description.into_option() {
            builder = builder.bind(("description", description));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status_str(status).to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;
        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_role(rows, id)?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> WardenResult<()> {
        // Existence check first so a foreign tenant cannot strip our edges.
        self.get_by_id(tenant_id, id).await?;

        self.db
            .query(
                "DELETE has_role WHERE out = type::record('role', $id); \
                 DELETE grants WHERE in = type::record('role', $id); \
                 DELETE type::record('role', $id) WHERE tenant_id = $tenant_id;",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<Role>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM role \
                 WHERE tenant_id = $tenant_id GROUP ALL",
            )
            .bind(("tenant_id", tenant_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_role())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn assign_to_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> WardenResult<()> {
        self.ensure_in_tenant(tenant_id, user_id, role_id).await?;

        let query = format!(
            "RELATE user:`{user_id}` -> has_role -> role:`{role_id}` \
             SET tenant_id = $tenant_id;"
        );

        let outcome = self
            .db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::statement("role assignment", e));

        match outcome {
            Ok(_) | Err(DbError::Conflict { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn unassign_from_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> WardenResult<()> {
        self.db
            .query(
                "DELETE has_role WHERE \
                 in = type::record('user', $user_id) AND \
                 out = type::record('role', $role_id) AND \
                 tenant_id = $tenant_id",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_user_role_ids(&self, tenant_id: Uuid, user_id: Uuid) -> WardenResult<Vec<Uuid>> {
        // Disabled roles confer nothing.
        let mut result = self
            .db
            .query(
                "SELECT VALUE meta::id(id) FROM role \
                 WHERE tenant_id = $tenant_id AND status = 'Enabled' \
                 AND id IN (\
                     SELECT VALUE out FROM has_role \
                     WHERE in = type::record('user', $user_id) \
                     AND tenant_id = $tenant_id\
                 )",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let ids: Vec<String> = result.take(0).map_err(DbError::from)?;
        Ok(ids
            .iter()
            .map(|id| parse_uuid(ENTITY, id))
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
