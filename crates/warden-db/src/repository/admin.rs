//! SurrealDB implementation of [`AdminRepository`].
//!
//! The scope is stored as a `System`/`App` tag plus an optional tenant id;
//! an `App` row without a tenant is corrupt.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::admin::{Admin, AdminScope, CreateAdmin, UpdateAdmin};
use warden_core::repository::{AdminRepository, PaginatedResult, Pagination};

use super::{CountRow, parse_uuid};
use crate::error::DbError;

const ENTITY: &str = "admin";

#[derive(Debug, SurrealValue)]
struct AdminRow {
    username: String,
    email: Option<String>,
    password_hash: String,
    scope: String,
    tenant_id: Option<String>,
    is_active: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AdminRowWithId {
    record_id: String,
    username: String,
    email: Option<String>,
    password_hash: String,
    scope: String,
    tenant_id: Option<String>,
    is_active: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn scope_columns(scope: AdminScope) -> (&'static str, Option<String>) {
    match scope {
        AdminScope::System => ("System", None),
        AdminScope::App(tenant_id) => ("App", Some(tenant_id.to_string())),
    }
}

fn parse_scope(tag: &str, tenant_id: Option<&str>) -> Result<AdminScope, DbError> {
    match (tag, tenant_id) {
        ("System", _) => Ok(AdminScope::System),
        ("App", Some(tenant_id)) => Ok(AdminScope::App(parse_uuid(ENTITY, tenant_id)?)),
        (other, tenant_id) => Err(DbError::Corrupt {
            entity: ENTITY,
            message: format!("invalid scope {other} with tenant {tenant_id:?}"),
        }),
    }
}

impl AdminRow {
    fn into_admin(self, id: Uuid) -> Result<Admin, DbError> {
        Ok(Admin {
            id,
            scope: parse_scope(&self.scope, self.tenant_id.as_deref())?,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl AdminRowWithId {
    fn try_into_admin(self) -> Result<Admin, DbError> {
        let id = parse_uuid(ENTITY, &self.record_id)?;
        AdminRow {
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            scope: self.scope,
            tenant_id: self.tenant_id,
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_admin(id)
    }
}

fn first_admin(rows: Vec<AdminRow>, id: Uuid) -> Result<Admin, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found(ENTITY, id))?
        .into_admin(id)
}

/// SurrealDB implementation of the administrator repository.
#[derive(Clone)]
pub struct SurrealAdminRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAdminRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_by(&self, field: &'static str, value: &str) -> WardenResult<Admin> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM admin \
             WHERE {field} = $value LIMIT 1"
        );
        let mut result = self
            .db
            .query(query)
            .bind(("value", value.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AdminRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found(ENTITY, format!("{field}={value}")))?;

        Ok(row.try_into_admin()?)
    }
}

impl<C: Connection> AdminRepository for SurrealAdminRepository<C> {
    async fn create(&self, input: CreateAdmin) -> WardenResult<Admin> {
        let id = Uuid::new_v4();
        let (scope, tenant_id) = scope_columns(input.scope);

        let result = self
            .db
            .query(
                "CREATE type::record('admin', $id) SET \
                 username = $username, email = $email, \
                 password_hash = $password_hash, \
                 scope = $scope, tenant_id = $tenant_id, \
                 is_active = true, last_login_at = NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("username", input.username))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("scope", scope.to_string()))
            .bind(("tenant_id", tenant_id))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;
        let rows: Vec<AdminRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_admin(rows, id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Admin> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('admin', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AdminRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_admin(rows, id)?)
    }

    async fn get_by_username(&self, username: &str) -> WardenResult<Admin> {
        self.find_by("username", username).await
    }

    async fn get_by_email(&self, email: &str) -> WardenResult<Admin> {
        self.find_by("email", email).await
    }

    async fn update(&self, id: Uuid, input: UpdateAdmin) -> WardenResult<Admin> {
        let mut sets = Vec::new();
        if !input.email.is_unchanged() {
            sets.push("email = $email");
        }
        if input.password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('admin', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(email) = input.email.into_option() {
            builder = builder.bind(("email", email));
        }
        if let Some(password_hash) = input.password_hash {
            builder = builder.bind(("password_hash", password_hash));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;
        let rows: Vec<AdminRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_admin(rows, id)?)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> WardenResult<()> {
        self.db
            .query(
                "UPDATE type::record('admin', $id) SET last_login_at = $at",
            )
            .bind(("id", id.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;
        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<Admin>> {
        let filter = if tenant_id.is_some() {
            "WHERE tenant_id = $tenant_id"
        } else {
            ""
        };
        let tenant_id_str = tenant_id.map(|t| t.to_string());

        let mut count_result = self
            .db
            .query(format!("SELECT count() AS total FROM admin {filter} GROUP ALL"))
            .bind(("tenant_id", tenant_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM admin {filter} \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AdminRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_admin())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
