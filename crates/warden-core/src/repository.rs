//! Repository trait definitions for the Credential Store.
//!
//! All repository operations are async. Tenant-scoped repositories
//! require a `tenant_id` parameter to enforce data isolation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::WardenResult;
use crate::models::{
    admin::{Admin, CreateAdmin, UpdateAdmin},
    api_resource::{ApiResource, CreateApiResource, UpdateApiResource},
    permission::{CreatePermission, Permission, UpdatePermission},
    role::{CreateRole, Role, UpdateRole},
    tenant::{CreateTenant, Tenant, UpdateTenant},
    token::{CreateTokenRecord, SubjectKind, TokenRecord},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Global scope
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    /// Generates the tenant id and its initial secret.
    fn create(&self, input: CreateTenant) -> impl Future<Output = WardenResult<Tenant>> + Send;
    /// Soft-deleted tenants are reported as not found.
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Tenant>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTenant,
    ) -> impl Future<Output = WardenResult<Tenant>> + Send;
    /// Replaces the secret; the previous one stops matching immediately.
    fn rotate_secret(&self, id: Uuid) -> impl Future<Output = WardenResult<Tenant>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<Tenant>>> + Send;
}

pub trait AdminRepository: Send + Sync {
    fn create(&self, input: CreateAdmin) -> impl Future<Output = WardenResult<Admin>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Admin>> + Send;
    fn get_by_username(&self, username: &str)
    -> impl Future<Output = WardenResult<Admin>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = WardenResult<Admin>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateAdmin,
    ) -> impl Future<Output = WardenResult<Admin>> + Send;
    fn record_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = WardenResult<()>> + Send;
    /// `Some(tenant)` restricts the listing to that tenant's app admins.
    fn list(
        &self,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<Admin>>> + Send;
}

pub trait TokenRepository: Send + Sync {
    fn create(
        &self,
        input: CreateTokenRecord,
    ) -> impl Future<Output = WardenResult<TokenRecord>> + Send;
    fn list_by_subject(
        &self,
        subject_kind: SubjectKind,
        subject_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<TokenRecord>>> + Send;
    /// Purges records whose expiry is before `now`. Returns how many went.
    fn delete_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = WardenResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped repositories
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_username(
        &self,
        tenant_id: Uuid,
        username: &str,
    ) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_phone(
        &self,
        tenant_id: Uuid,
        phone: &str,
    ) -> impl Future<Output = WardenResult<User>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = WardenResult<User>> + Send;
    /// Soft delete: the user is disabled, never removed.
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<User>>> + Send;
}

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = WardenResult<Role>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = WardenResult<Role>> + Send;
    /// Enabled roles among `ids`; unknown ids are skipped.
    fn get_many(
        &self,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> impl Future<Output = WardenResult<Vec<Role>>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = WardenResult<Role>> + Send;
    /// Also removes the role's user and permission associations.
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<Role>>> + Send;

    /// Assigning a role the user already holds is a no-op.
    fn assign_to_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = WardenResult<()>> + Send;
    fn unassign_from_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = WardenResult<()>> + Send;
    fn get_user_role_ids(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<Uuid>>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = WardenResult<Permission>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = WardenResult<Permission>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdatePermission,
    ) -> impl Future<Output = WardenResult<Permission>> + Send;
    /// Also removes the permission's role grants.
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<Permission>>> + Send;

    /// Granting a permission the role already holds is a no-op.
    fn grant_to_role(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = WardenResult<()>> + Send;
    fn revoke_from_role(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = WardenResult<()>> + Send;
    fn get_role_permission_ids(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<Uuid>>> + Send;
}

pub trait ApiResourceRepository: Send + Sync {
    fn create(
        &self,
        input: CreateApiResource,
    ) -> impl Future<Output = WardenResult<ApiResource>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = WardenResult<ApiResource>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateApiResource,
    ) -> impl Future<Output = WardenResult<ApiResource>> + Send;
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<ApiResource>>> + Send;
    /// Enabled bindings guarded by `permission_id`.
    fn get_by_permission(
        &self,
        tenant_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<ApiResource>>> + Send;
}
