//! SurrealDB implementation of [`TenantRepository`].
//!
//! Tenants are soft-deleted: a `deleted_at` timestamp hides them from every
//! read, and their names stay reserved.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::tenant::{CreateTenant, LoginMethod, Tenant, UpdateTenant};
use warden_core::repository::{PaginatedResult, Pagination, TenantRepository};

use super::{CountRow, parse_status, parse_uuid, status_str};
use crate::error::DbError;

const ENTITY: &str = "tenant";

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct TenantRow {
    name: String,
    description: Option<String>,
    secret: String,
    status: String,
    login_method: Option<i64>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TenantRowWithId {
    record_id: String,
    name: String,
    description: Option<String>,
    secret: String,
    status: String,
    login_method: Option<i64>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRow {
    fn into_tenant(self, id: Uuid) -> Result<Tenant, DbError> {
        let login_method = self
            .login_method
            .map(|code| {
                LoginMethod::from_code(code).ok_or_else(|| DbError::Corrupt {
                    entity: ENTITY,
                    message: format!("unknown login method {code}"),
                })
            })
            .transpose()?;
        Ok(Tenant {
            id,
            name: self.name,
            description: self.description,
            secret: self.secret,
            status: parse_status(ENTITY, &self.status)?,
            login_method,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TenantRowWithId {
    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        let id = parse_uuid(ENTITY, &self.record_id)?;
        TenantRow {
            name: self.name,
            description: self.description,
            secret: self.secret,
            status: self.status,
            login_method: self.login_method,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_tenant(id)
    }
}

/// Fresh tenant secret: `app_` followed by 32 random bytes in hex.
pub(crate) fn generate_secret() -> String {
    format!("app_{}", hex::encode(rand::random::<[u8; 32]>()))
}

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

fn first_tenant(rows: Vec<TenantRow>, id: Uuid) -> Result<Tenant, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found(ENTITY, id))?
        .into_tenant(id)
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant) -> WardenResult<Tenant> {
        let id = Uuid::new_v4();

        let result = self
            .db
            .query(
                "CREATE type::record('tenant', $id) SET \
                 name = $name, description = $description, \
                 secret = $secret, status = 'Enabled', \
                 login_method = $login_method, deleted_at = NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("secret", generate_secret()))
            .bind(("login_method", input.login_method.map(LoginMethod::code)))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;
        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_tenant(rows, id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Tenant> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('tenant', $id) \
                 WHERE deleted_at = NONE",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_tenant(rows, id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateTenant) -> WardenResult<Tenant> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if !input.description.is_unchanged() {
            sets.push("description = $description");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if !input.login_method.is_unchanged() {
            sets.push("login_method = $login_method");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('tenant', $id) SET {} \
             WHERE deleted_at = NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description.into_option() {
            builder = builder.bind(("description", description));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status_str(status).to_string()));
        }
        if let Some(method) = input.login_method.map(LoginMethod::code).into_option() {
            builder = builder.bind(("login_method", method));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;
        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_tenant(rows, id)?)
    }

    async fn rotate_secret(&self, id: Uuid) -> WardenResult<Tenant> {
        let result = self
            .db
            .query(
                "UPDATE type::record('tenant', $id) SET \
                 secret = $secret, updated_at = time::now() \
                 WHERE deleted_at = NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("secret", generate_secret()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;
        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_tenant(rows, id)?)
    }

    async fn delete(&self, id: Uuid) -> WardenResult<()> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('tenant', $id) SET \
                 deleted_at = time::now(), updated_at = time::now() \
                 WHERE deleted_at = NONE",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        first_tenant(rows, id)?;
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> WardenResult<PaginatedResult<Tenant>> {
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM tenant \
                 WHERE deleted_at = NONE GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM tenant \
                 WHERE deleted_at = NONE \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_tenant())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
