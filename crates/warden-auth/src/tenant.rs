//! Tenant credential checks and tenant management.

use std::time::Duration;

use subtle::ConstantTimeEq;
use tracing::info;
use uuid::Uuid;
use warden_core::deadline::with_deadline;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::tenant::{CreateTenant, Tenant, UpdateTenant};
use warden_core::repository::{PaginatedResult, Pagination, TenantRepository};

use crate::admin::AdminPrincipal;

/// Load a tenant that may currently be used. Missing, soft-deleted and
/// disabled tenants are all [`WardenError::TenantUnavailable`].
pub(crate) async fn load_available<Tn: TenantRepository>(
    tenants: &Tn,
    tenant_id: Uuid,
    deadline: Duration,
) -> WardenResult<Tenant> {
    let tenant = match with_deadline(deadline, "tenant lookup", tenants.get_by_id(tenant_id)).await
    {
        Ok(tenant) => tenant,
        Err(WardenError::NotFound { .. }) => return Err(WardenError::TenantUnavailable),
        Err(e) => return Err(e),
    };
    if !tenant.is_available() {
        return Err(WardenError::TenantUnavailable);
    }
    Ok(tenant)
}

/// Tenant credential validation and system-administrator management.
#[derive(Clone)]
pub struct TenantService<Tn: TenantRepository> {
    tenants: Tn,
    deadline: Duration,
}

impl<Tn: TenantRepository> TenantService<Tn> {
    pub fn new(tenants: Tn, deadline: Duration) -> Self {
        Self { tenants, deadline }
    }

    /// Check a tenant id + secret header pair.
    ///
    /// A wrong secret is [`WardenError::InvalidCredentials`] whatever the
    /// tenant's status; a right secret on a disabled tenant is
    /// [`WardenError::TenantUnavailable`].
    pub async fn validate_credentials(&self, tenant_id: Uuid, secret: &str) -> WardenResult<Tenant> {
        let tenant = match with_deadline(
            self.deadline,
            "tenant lookup",
            self.tenants.get_by_id(tenant_id),
        )
        .await
        {
            Ok(tenant) => tenant,
            Err(WardenError::NotFound { .. }) => return Err(WardenError::TenantUnavailable),
            Err(e) => return Err(e),
        };

        if !bool::from(tenant.secret.as_bytes().ct_eq(secret.as_bytes())) {
            return Err(WardenError::InvalidCredentials);
        }
        if !tenant.is_available() {
            return Err(WardenError::TenantUnavailable);
        }
        Ok(tenant)
    }

    pub async fn create(&self, actor: &AdminPrincipal, input: CreateTenant) -> WardenResult<Tenant> {
        actor.require_system()?;
        if input.name.trim().is_empty() {
            return Err(WardenError::validation("tenant name is required"));
        }
        let tenant =
            with_deadline(self.deadline, "tenant create", self.tenants.create(input)).await?;
        info!(tenant_id = %tenant.id, admin_id = %actor.id, "tenant created");
        Ok(tenant)
    }

    /// Tenant admins may read their own tenant; system admins any.
    pub async fn get(&self, actor: &AdminPrincipal, tenant_id: Uuid) -> WardenResult<Tenant> {
        let tenant_id = actor.resolve_target_tenant(Some(tenant_id))?;
        with_deadline(self.deadline, "tenant lookup", self.tenants.get_by_id(tenant_id)).await
    }

    pub async fn update(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Uuid,
        input: UpdateTenant,
    ) -> WardenResult<Tenant> {
        actor.require_system()?;
        if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(WardenError::validation("tenant name cannot be blank"));
        }
        with_deadline(
            self.deadline,
            "tenant update",
            self.tenants.update(tenant_id, input),
        )
        .await
    }

    /// Issue a new secret. The old one stops matching immediately.
    pub async fn rotate_secret(&self, actor: &AdminPrincipal, tenant_id: Uuid) -> WardenResult<Tenant> {
        actor.require_system()?;
        let tenant = with_deadline(
            self.deadline,
            "tenant secret rotation",
            self.tenants.rotate_secret(tenant_id),
        )
        .await?;
        info!(%tenant_id, admin_id = %actor.id, "tenant secret rotated");
        Ok(tenant)
    }

    pub async fn delete(&self, actor: &AdminPrincipal, tenant_id: Uuid) -> WardenResult<()> {
        actor.require_system()?;
        with_deadline(self.deadline, "tenant delete", self.tenants.delete(tenant_id)).await?;
        info!(%tenant_id, admin_id = %actor.id, "tenant deleted");
        Ok(())
    }

    pub async fn list(
        &self,
        actor: &AdminPrincipal,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<Tenant>> {
        actor.require_system()?;
        with_deadline(self.deadline, "tenant list", self.tenants.list(pagination)).await
    }
}
