//! SurrealDB implementation of [`ApiResourceRepository`].
//!
//! Methods are stored upper-cased so `get` and `GET` bind the same route.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::api_resource::{ApiResource, CreateApiResource, UpdateApiResource};
use warden_core::repository::{ApiResourceRepository, PaginatedResult, Pagination};

use super::{CountRow, parse_status, parse_uuid, status_str};
use crate::error::DbError;

const ENTITY: &str = "api_resource";

#[derive(Debug, SurrealValue)]
struct ApiResourceRow {
    tenant_id: String,
    path: String,
    method: String,
    description: Option<String>,
    permission_id: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ApiResourceRowWithId {
    record_id: String,
    tenant_id: String,
    path: String,
    method: String,
    description: Option<String>,
    permission_id: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ApiResourceRow {
    fn into_api_resource(self, id: Uuid) -> Result<ApiResource, DbError> {
        Ok(ApiResource {
            id,
            tenant_id: parse_uuid(ENTITY, &self.tenant_id)?,
            path: self.path,
            method: self.method,
            description: self.description,
            permission_id: parse_uuid(ENTITY, &self.permission_id)?,
            status: parse_status(ENTITY, &self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ApiResourceRowWithId {
    fn try_into_api_resource(self) -> Result<ApiResource, DbError> {
        let id = parse_uuid(ENTITY, &self.record_id)?;
        ApiResourceRow {
            tenant_id: self.tenant_id,
            path: self.path,
            method: self.method,
            description: self.description,
            permission_id: self.permission_id,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_api_resource(id)
    }
}

fn first_api_resource(rows: Vec<ApiResourceRow>, id: Uuid) -> Result<ApiResource, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found(ENTITY, id))?
        .into_api_resource(id)
}

/// SurrealDB implementation of the API binding repository.
#[derive(Clone)]
pub struct SurrealApiResourceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealApiResourceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// A binding may only point at a permission of its own tenant.
    async fn ensure_permission(&self, tenant_id: Uuid, permission_id: Uuid) -> Result<(), DbError> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE meta::id(id) FROM type::record('permission', $perm_id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("perm_id", permission_id.to_string()))
            .await?;

        let found: Vec<String> = result.take(0)?;
        if found.is_empty() {
            return Err(DbError::not_found("permission", permission_id));
        }
        Ok(())
    }
}

impl<C: Connection> ApiResourceRepository for SurrealApiResourceRepository<C> {
    async fn create(&self, input: CreateApiResource) -> WardenResult<ApiResource> {
        self.ensure_permission(input.tenant_id, input.permission_id)
            .await?;

        let id = Uuid::new_v4();
        let result = self
            .db
            .query(
                "CREATE type::record('api_resource', $id) SET \
                 tenant_id = $tenant_id, path = $path, method = $method, \
                 description = $description, permission_id = $permission_id, \
                 status = 'Enabled'",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("path", input.path))
            .bind(("method", input.method.to_ascii_uppercase()))
            .bind(("description", input.description))
            .bind(("permission_id", input.permission_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;
        let rows: Vec<ApiResourceRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_api_resource(rows, id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> WardenResult<ApiResource> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('api_resource', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApiResourceRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_api_resource(rows, id)?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateApiResource,
    ) -> WardenResult<ApiResource> {
        if let Some(permission_id) = input.permission_id {
            self.ensure_permission(tenant_id, permission_id).await?;
        }

        let mut sets = Vec::new();
        if input.path.is_some() {
            sets.push("path = $path");
        }
        if input.method.is_some() {
            sets.push("method = $method");
        }
        if !input.description.is_unchanged() {
            sets.push("description = $description");
        }
        if input.permission_id.is_some() {
            sets.push("permission_id = $permission_id");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('api_resource', $id) SET {} \
             WHERE tenant_id = $tenant_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(path) = input.path {
            builder = builder.bind(("path", path));
        }
        if let Some(method) = input.method {
            builder = builder.bind(("method", method.to_ascii_uppercase()));
        }
        if let Some(description) = input.description.into_option() {
            builder = builder.bind(("description", description));
        }
        if let Some(permission_id) = input.permission_id {
            builder = builder.bind(("permission_id", permission_id.to_string()));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status_str(status).to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;
        let rows: Vec<ApiResourceRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_api_resource(rows, id)?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> WardenResult<()> {
        let mut result = self
            .db
            .query("DELETE type::record('api_resource', $id) WHERE tenant_id = $tenant_id RETURN BEFORE")
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApiResourceRow> = result.take(0).map_err(DbError::from)?;
        first_api_resource(rows, id)?;
        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<ApiResource>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM api_resource \
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
                "SELECT meta::id(id) AS record_id, * FROM api_resource \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApiResourceRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_api_resource())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn get_by_permission(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
    ) -> WardenResult<Vec<ApiResource>> {
        // A disabled permission guards nothing.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM api_resource \
                 WHERE tenant_id = $tenant_id \
                 AND permission_id = $permission_id \
                 AND status = 'Enabled' \
                 AND 'Enabled' IN (\
                     SELECT VALUE status FROM type::record('permission', $permission_id)\
                 )",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("permission_id", permission_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApiResourceRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_api_resource())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
