//! SurrealDB implementation of [`UserRepository`].
//!
//! Passwords arrive already hashed; this layer never sees plaintext.
//! Usernames are unique per tenant through an index. Optional emails and
//! phones are unique per tenant too, checked before every write that sets
//! one.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::user::{CreateUser, UpdateUser, User};
use warden_core::patch::Patch;
use warden_core::repository::{PaginatedResult, Pagination, UserRepository};

use super::{CountRow, parse_status, parse_uuid, status_str};
use crate::error::DbError;

const ENTITY: &str = "user";

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    tenant_id: String,
    username: String,
    email: Option<String>,
    phone: Option<String>,
    password_hash: String,
    is_super_admin: bool,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    tenant_id: String,
    username: String,
    email: Option<String>,
    phone: Option<String>,
    password_hash: String,
    is_super_admin: bool,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        Ok(User {
            id,
            tenant_id: parse_uuid(ENTITY, &self.tenant_id)?,
            username: self.username,
            email: self.email,
            phone: self.phone,
            password_hash: self.password_hash,
            is_super_admin: self.is_super_admin,
            status: parse_status(ENTITY, &self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = parse_uuid(ENTITY, &self.record_id)?;
        UserRow {
            tenant_id: self.tenant_id,
            username: self.username,
            email: self.email,
            phone: self.phone,
            password_hash: self.password_hash,
            is_super_admin: self.is_super_admin,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_user(id)
    }
}

/// Contact fields with a per-tenant uniqueness rule.
#[derive(Clone, Copy)]
enum Contact {
    Email,
    Phone,
}

impl Contact {
    fn field(self) -> &'static str {
        match self {
            Contact::Email => "email",
            Contact::Phone => "phone",
        }
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_one(
        &self,
        tenant_id: Uuid,
        field: &'static str,
        value: &str,
    ) -> Result<Option<User>, DbError> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user \
             WHERE tenant_id = $tenant_id AND {field} = $value \
             LIMIT 1"
        );
        let mut result = self
            .db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("value", value.to_string()))
            .await?;

        let rows: Vec<UserRowWithId> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(UserRowWithId::try_into_user)
            .transpose()
    }

    async fn get_by_contact(
        &self,
        tenant_id: Uuid,
        contact: Contact,
        value: &str,
    ) -> WardenResult<User> {
        let field = contact.field();
        Ok(self
            .find_one(tenant_id, field, value)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, format!("{field}={value}")))?)
    }

    /// Fails with a conflict when another user of the tenant already holds
    /// `value`. `owner` is the user being updated, if any.
    async fn ensure_contact_free(
        &self,
        tenant_id: Uuid,
        contact: Contact,
        value: Option<&str>,
        owner: Option<Uuid>,
    ) -> Result<(), DbError> {
        let Some(value) = value else {
            return Ok(());
        };
        match self.find_one(tenant_id, contact.field(), value).await? {
            Some(existing) if Some(existing.id) != owner => Err(DbError::Conflict {
                entity: format!("user {}", contact.field()),
            }),
            _ => Ok(()),
        }
    }
}

fn first_user(rows: Vec<UserRow>, id: Uuid) -> Result<User, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found(ENTITY, id))?
        .into_user(id)
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> WardenResult<User> {
        self.ensure_contact_free(input.tenant_id, Contact::Email, input.email.as_deref(), None)
            .await?;
        self.ensure_contact_free(input.tenant_id, Contact::Phone, input.phone.as_deref(), None)
            .await?;

        let id = Uuid::new_v4();
        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 tenant_id = $tenant_id, \
                 username = $username, email = $email, phone = $phone, \
                 password_hash = $password_hash, \
                 is_super_admin = $is_super_admin, \
                 status = 'Enabled'",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("username", input.username))
            .bind(("email", input.email))
            .bind(("phone", input.phone))
            .bind(("password_hash", input.password_hash))
            .bind(("is_super_admin", input.is_super_admin))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;
        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_user(rows, id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> WardenResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('user', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_user(rows, id)?)
    }

    async fn get_by_username(&self, tenant_id: Uuid, username: &str) -> WardenResult<User> {
        Ok(self
            .find_one(tenant_id, "username", username)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, format!("username={username}")))?)
    }

    async fn get_by_email(&self, tenant_id: Uuid, email: &str) -> WardenResult<User> {
        self.get_by_contact(tenant_id, Contact::Email, email).await
    }

    async fn get_by_phone(&self, tenant_id: Uuid, phone: &str) -> WardenResult<User> {
        self.get_by_contact(tenant_id, Contact::Phone, phone).await
    }

    async fn update(&self, tenant_id: Uuid, id: Uuid, input: UpdateUser) -> WardenResult<User> {
        if let Patch::Set(email) = &input.email {
            self.ensure_contact_free(tenant_id, Contact::Email, Some(email), Some(id))
                .await?;
        }
        if let Patch::Set(phone) = &input.phone {
            self.ensure_contact_free(tenant_id, Contact::Phone, Some(phone), Some(id))
                .await?;
        }

        let mut sets = Vec::new();
        if !input.email.is_unchanged() {
            sets.push("email = $email");
        }
        if !input.phone.is_unchanged() {
            sets.push("phone = $phone");
        }
        if input.password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.is_super_admin.is_some() {
            sets.push("is_super_admin = $is_super_admin");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {} \
             WHERE tenant_id = $tenant_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(email) = input.email.into_option() {
            builder = builder.bind(("email", email));
        }
        if let Some(phone) = input.phone.into_option() {
            builder = builder.bind(("phone", phone));
        }
        if let Some(password_hash) = input.password_hash {
            builder = builder.bind(("password_hash", password_hash));
        }
        if let Some(is_super_admin) = input.is_super_admin {
            builder = builder.bind(("is_super_admin", is_super_admin));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status_str(status).to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;
        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_user(rows, id)?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> WardenResult<()> {
        // Soft-delete: disable, keep the row for token and audit references.
        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 status = 'Disabled', updated_at = time::now() \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        first_user(rows, id)?;
        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<User>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM user \
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
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_user())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
