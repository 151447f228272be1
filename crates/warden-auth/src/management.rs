//! Tenant-scoped administration of users, roles, permissions and API
//! bindings.
//!
//! Every operation resolves the target tenant through
//! [`AdminPrincipal::resolve_target_tenant`] before touching the store.
//! Changes here are not pushed to the permission cache; they show up once
//! the cached layer expires.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;
use warden_core::deadline::with_deadline;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::api_resource::{ApiResource, CreateApiResource, UpdateApiResource};
use warden_core::models::permission::{CreatePermission, Permission, UpdatePermission};
use warden_core::models::role::{CreateRole, Role, UpdateRole};
use warden_core::models::user::{CreateUser, UpdateUser, User};
use warden_core::repository::{
    ApiResourceRepository, PaginatedResult, Pagination, PermissionRepository, RoleRepository,
    UserRepository,
};

use crate::admin::AdminPrincipal;
use crate::config::AuthConfig;
use crate::password;

/// A principal created by an administrator.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
    pub is_super_admin: bool,
}

pub struct ManagementService<U, R, P, A>
where
    U: UserRepository,
    R: RoleRepository,
    P: PermissionRepository,
    A: ApiResourceRepository,
{
    users: U,
    roles: R,
    permissions: P,
    api_resources: A,
    config: AuthConfig,
}

impl<U, R, P, A> ManagementService<U, R, P, A>
where
    U: UserRepository,
    R: RoleRepository,
    P: PermissionRepository,
    A: ApiResourceRepository,
{
    pub fn new(users: U, roles: R, permissions: P, api_resources: A, config: AuthConfig) -> Self {
        Self {
            users,
            roles,
            permissions,
            api_resources,
            config,
        }
    }

    fn deadline(&self) -> Duration {
        self.config.io_deadline()
    }

    // -- users --------------------------------------------------------------

    /// Unlike self-registration this may create a tenant super-admin.
    pub async fn create_user(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        input: NewUser,
    ) -> WardenResult<User> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        if input.username.trim().is_empty() {
            return Err(WardenError::validation("username is required"));
        }
        self.config.check_password_length(&input.password)?;

        let password_hash =
            password::hash_password(&input.password, self.config.pepper.as_deref())?;
        let user = with_deadline(
            self.deadline(),
            "user create",
            self.users.create(CreateUser {
                tenant_id,
                username: input.username,
                email: input.email.filter(|e| !e.is_empty()),
                phone: input.phone.filter(|p| !p.is_empty()),
                password_hash,
                is_super_admin: input.is_super_admin,
            }),
        )
        .await?;

        info!(user_id = %user.id, %tenant_id, created_by = %actor.id, "principal created");
        Ok(user)
    }

    pub async fn get_user(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        user_id: Uuid,
    ) -> WardenResult<User> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(self.deadline(), "user lookup", self.users.get_by_id(tenant_id, user_id))
            .await
    }

    /// Enabled roles the principal holds.
    pub async fn user_roles(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        user_id: Uuid,
    ) -> WardenResult<Vec<Role>> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        self.roles_of(tenant_id, user_id).await
    }

    /// Enabled permissions reachable through the principal's enabled
    /// roles, read from the store rather than the permission cache.
    pub async fn user_permissions(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        user_id: Uuid,
    ) -> WardenResult<Vec<Permission>> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        let mut seen = BTreeSet::new();
        let mut granted = Vec::new();
        for role in self.roles_of(tenant_id, user_id).await? {
            for permission in self.granted_to(tenant_id, role.id).await? {
                if permission.status.is_enabled() && seen.insert(permission.id) {
                    granted.push(permission);
                }
            }
        }
        Ok(granted)
    }

    pub async fn list_users(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<User>> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(self.deadline(), "user list", self.users.list(tenant_id, pagination)).await
    }

    pub async fn update_user(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        user_id: Uuid,
        input: UpdateUser,
    ) -> WardenResult<User> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(
            self.deadline(),
            "user update",
            self.users.update(tenant_id, user_id, input),
        )
        .await
    }

    pub async fn delete_user(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        user_id: Uuid,
    ) -> WardenResult<()> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(self.deadline(), "user delete", self.users.delete(tenant_id, user_id)).await
    }

    // -- roles --------------------------------------------------------------

    pub async fn create_role(
        &self,
        actor: &AdminPrincipal,
        input: CreateRole,
    ) -> WardenResult<Role> {
        actor.resolve_target_tenant(Some(input.tenant_id))?;
        let role = with_deadline(self.deadline(), "role create", self.roles.create(input)).await?;
        info!(role_id = %role.id, tenant_id = %role.tenant_id, "role created");
        Ok(role)
    }

    pub async fn update_role(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        role_id: Uuid,
        input: UpdateRole,
    ) -> WardenResult<Role> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(
            self.deadline(),
            "role update",
            self.roles.update(tenant_id, role_id, input),
        )
        .await
    }

    pub async fn delete_role(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        role_id: Uuid,
    ) -> WardenResult<()> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(self.deadline(), "role delete", self.roles.delete(tenant_id, role_id)).await
    }

    pub async fn list_roles(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<Role>> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(self.deadline(), "role list", self.roles.list(tenant_id, pagination)).await
    }

    pub async fn assign_role(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        user_id: Uuid,
        role_id: Uuid,
    ) -> WardenResult<()> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(
            self.deadline(),
            "role assignment",
            self.roles.assign_to_user(tenant_id, user_id, role_id),
        )
        .await?;
        info!(%user_id, %role_id, %tenant_id, "role assigned");
        Ok(())
    }

    pub async fn unassign_role(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        user_id: Uuid,
        role_id: Uuid,
    ) -> WardenResult<()> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(
            self.deadline(),
            "role unassignment",
            self.roles.unassign_from_user(tenant_id, user_id, role_id),
        )
        .await
    }

    /// Every permission granted to the role, enabled or not.
    pub async fn role_permissions(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        role_id: Uuid,
    ) -> WardenResult<Vec<Permission>> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(self.deadline(), "role lookup", self.roles.get_by_id(tenant_id, role_id))
            .await?;
        self.granted_to(tenant_id, role_id).await
    }

    // -- permissions --------------------------------------------------------

    pub async fn create_permission(
        &self,
        actor: &AdminPrincipal,
        input: CreatePermission,
    ) -> WardenResult<Permission> {
        actor.resolve_target_tenant(Some(input.tenant_id))?;
        with_deadline(
            self.deadline(),
            "permission create",
            self.permissions.create(input),
        )
        .await
    }

    pub async fn update_permission(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        permission_id: Uuid,
        input: UpdatePermission,
    ) -> WardenResult<Permission> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(
            self.deadline(),
            "permission update",
            self.permissions.update(tenant_id, permission_id, input),
        )
        .await
    }

    pub async fn delete_permission(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        permission_id: Uuid,
    ) -> WardenResult<()> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(
            self.deadline(),
            "permission delete",
            self.permissions.delete(tenant_id, permission_id),
        )
        .await
    }

    pub async fn list_permissions(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<Permission>> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(
            self.deadline(),
            "permission list",
            self.permissions.list(tenant_id, pagination),
        )
        .await
    }

    pub async fn grant_permission(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> WardenResult<()> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(
            self.deadline(),
            "permission grant",
            self.permissions.grant_to_role(tenant_id, role_id, permission_id),
        )
        .await?;
        info!(%role_id, %permission_id, %tenant_id, "permission granted");
        Ok(())
    }

    pub async fn revoke_permission(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> WardenResult<()> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(
            self.deadline(),
            "permission revoke",
            self.permissions
                .revoke_from_role(tenant_id, role_id, permission_id),
        )
        .await
    }

    // -- API bindings -------------------------------------------------------

    pub async fn create_api_resource(
        &self,
        actor: &AdminPrincipal,
        input: CreateApiResource,
    ) -> WardenResult<ApiResource> {
        actor.resolve_target_tenant(Some(input.tenant_id))?;
        with_deadline(
            self.deadline(),
            "api resource create",
            self.api_resources.create(input),
        )
        .await
    }

    pub async fn update_api_resource(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        api_resource_id: Uuid,
        input: UpdateApiResource,
    ) -> WardenResult<ApiResource> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(
            self.deadline(),
            "api resource update",
            self.api_resources.update(tenant_id, api_resource_id, input),
        )
        .await
    }

    pub async fn delete_api_resource(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        api_resource_id: Uuid,
    ) -> WardenResult<()> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(
            self.deadline(),
            "api resource delete",
            self.api_resources.delete(tenant_id, api_resource_id),
        )
        .await
    }

    pub async fn list_api_resources(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<ApiResource>> {
        let tenant_id = actor.resolve_target_tenant(tenant_id)?;
        with_deadline(
            self.deadline(),
            "api resource list",
            self.api_resources.list(tenant_id, pagination),
        )
        .await
    }

    async fn roles_of(&self, tenant_id: Uuid, user_id: Uuid) -> WardenResult<Vec<Role>> {
        with_deadline(self.deadline(), "user lookup", self.users.get_by_id(tenant_id, user_id))
            .await?;
        let role_ids = with_deadline(
            self.deadline(),
            "role lookup",
            self.roles.get_user_role_ids(tenant_id, user_id),
        )
        .await?;
        with_deadline(
            self.deadline(),
            "role lookup",
            self.roles.get_many(tenant_id, &role_ids),
        )
        .await
    }

    async fn granted_to(&self, tenant_id: Uuid, role_id: Uuid) -> WardenResult<Vec<Permission>> {
        let ids = with_deadline(
            self.deadline(),
            "grant lookup",
            self.permissions.get_role_permission_ids(tenant_id, role_id),
        )
        .await?;

        let mut granted = Vec::with_capacity(ids.len());
        for permission_id in ids {
            match with_deadline(
                self.deadline(),
                "permission lookup",
                self.permissions.get_by_id(tenant_id, permission_id),
            )
            .await
            {
                Ok(permission) => granted.push(permission),
                Err(WardenError::NotFound { .. }) => {
                    debug!(%permission_id, "granted permission no longer exists");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(granted)
    }
}
