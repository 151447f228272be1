//! SurrealDB implementation of [`PermissionRepository`].
//!
//! Role grants are `grants` edges (`role -> grants -> permission`) stamped
//! with the tenant and unique per pair.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::permission::{CreatePermission, Permission, UpdatePermission};
use warden_core::repository::{PaginatedResult, Pagination, PermissionRepository};

use super::{CountRow, parse_status, parse_uuid, status_str};
use crate::error::DbError;

const ENTITY: &str = "permission";

#[derive(Debug, SurrealValue)]
struct PermissionRow {
    tenant_id: String,
    name: String,
    code: String,
    resource: String,
    action: String,
    description: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct PermissionRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    code: String,
    resource: String,
    action: String,
    description: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermissionRow {
    fn into_permission(self, id: Uuid) -> Result<Permission, DbError> {
        Ok(Permission {
            id,
            tenant_id: parse_uuid(ENTITY, &self.tenant_id)?,
            name: self.name,
            code: self.code,
            resource: self.resource,
            action: self.action,
            description: self.description,
            status: parse_status(ENTITY, &self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PermissionRowWithId {
    fn try_into_permission(self) -> Result<Permission, DbError> {
        let id = parse_uuid(ENTITY, &self.record_id)?;
        PermissionRow {
            tenant_id: self.tenant_id,
            name: self.name,
            code: self.code,
            resource: self.resource,
            action: self.action,
            description: self.description,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_permission(id)
    }
}

fn first_permission(rows: Vec<PermissionRow>, id: Uuid) -> Result<Permission, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found(ENTITY, id))?
        .into_permission(id)
}

/// SurrealDB implementation of the Permission repository.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn ensure_in_tenant(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), DbError> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE meta::id(id) FROM type::record('role', $role_id) \
                 WHERE tenant_id = $tenant_id; \
                 SELECT VALUE meta::id(id) FROM type::record('permission', $perm_id) \
                 WHERE tenant_id = $tenant_id;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .bind(("perm_id", permission_id.to_string()))
            .await?;

        let roles: Vec<String> = result.take(0)?;
        if roles.is_empty() {
            return Err(DbError::not_found("role", role_id));
        }
        let permissions: Vec<String> = result.take(1)?;
        if permissions.is_empty() {
            return Err(DbError::not_found(ENTITY, permission_id));
        }
        Ok(())
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create(&self, input: CreatePermission) -> WardenResult<Permission> {
        let id = Uuid::new_v4();

        let result = self
            .db
            .query(
                "CREATE type::record('permission', $id) SET \
                 tenant_id = $tenant_id, name = $name, code = $code, \
                 resource = $resource, action = $action, \
                 description = $description, status = 'Enabled'",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("code", input.code))
            .bind(("resource", input.resource))
            .bind(("action", input.action))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;
        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_permission(rows, id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> WardenResult<Permission> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('permission', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_permission(rows, id)?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdatePermission,
    ) -> WardenResult<Permission> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.code.is_some() {
            sets.push("code = $code");
        }
        if input.resource.is_some() {
            sets.push("resource = $resource");
        }
        if input.action.is_some() {
            sets.push("action = $action");
        }
        if !input.description.is_unchanged() {
            sets.push("description = $description");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('permission', $id) SET {} \
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
        if let Some(resource) = input.resource {
            builder = builder.bind(("resource", resource));
        }
        if let Some(action) = input.action {
            builder = builder.bind(("action", action));
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
        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_permission(rows, id)?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> WardenResult<()> {
        self.get_by_id(tenant_id, id).await?;

        // API bindings guarded by this permission go with it.
        self.db
            .query(
                "DELETE grants WHERE out = type::record('permission', $id); \
                 DELETE api_resource WHERE tenant_id = $tenant_id \
                 AND permission_id = $id; \
                 DELETE type::record('permission', $id) WHERE tenant_id = $tenant_id;",
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
    ) -> WardenResult<PaginatedResult<Permission>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM permission \
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
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_permission())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn grant_to_role(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> WardenResult<()> {
        self.ensure_in_tenant(tenant_id, role_id, permission_id)
            .await?;

        let query = format!(
            "RELATE role:`{role_id}` -> grants -> permission:`{permission_id}` \
             SET tenant_id = $tenant_id;"
        );

        let outcome = self
            .db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::statement("permission grant", e));

        match outcome {
            Ok(_) | Err(DbError::Conflict { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn revoke_from_role(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> WardenResult<()> {
        self.db
            .query(
                "DELETE grants WHERE \
                 in = type::record('role', $role_id) AND \
                 out = type::record('permission', $perm_id) AND \
                 tenant_id = $tenant_id",
            )
            .bind(("role_id", role_id.to_string()))
            .bind(("perm_id", permission_id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_role_permission_ids(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> WardenResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE meta::id(out) FROM grants \
                 WHERE in = type::record('role', $role_id) \
                 AND tenant_id = $tenant_id",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let ids: Vec<String> = result.take(0).map_err(DbError::from)?;
        Ok(ids
            .iter()
            .map(|id| parse_uuid(ENTITY, id))
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
