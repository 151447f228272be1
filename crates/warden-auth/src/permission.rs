//! Permission resolution: principal → roles → permissions → API bindings.
//!
//! Each join layer is cached on its own with a fixed TTL and no active
//! invalidation, so a role or permission change becomes visible once the
//! affected layer expires (12 h for permission sets, 24 h for API
//! bindings). Empty results are never cached.
//!
//! Cache failures degrade to a store read. Store failures abort the check
//! with a retryable error; they never read as "denied".

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;
use warden_core::cache::{
    API_BINDING_TTL, CacheStore, PERMISSION_SET_TTL, api_permission_key, role_permission_key,
    user_permission_key,
};
use warden_core::deadline::with_deadline;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::api_resource::binding_key;
use warden_core::repository::{ApiResourceRepository, PermissionRepository, RoleRepository};

/// Answers "may this principal do X" for one tenant at a time.
#[derive(Clone)]
pub struct PermissionService<R, P, A, C>
where
    R: RoleRepository,
    P: PermissionRepository,
    A: ApiResourceRepository,
    C: CacheStore,
{
    roles: R,
    permissions: P,
    api_resources: A,
    cache: C,
    deadline: Duration,
}

impl<R, P, A, C> PermissionService<R, P, A, C>
where
    R: RoleRepository,
    P: PermissionRepository,
    A: ApiResourceRepository,
    C: CacheStore,
{
    pub fn new(roles: R, permissions: P, api_resources: A, cache: C, deadline: Duration) -> Self {
        Self {
            roles,
            permissions,
            api_resources,
            cache,
            deadline,
        }
    }

    /// Whether `user_id` holds a permission whose code equals `code`.
    pub async fn check_user_permission(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        code: &str,
    ) -> WardenResult<bool> {
        let codes = self.user_permission_codes(user_id, tenant_id).await?;
        Ok(codes.iter().any(|c| c == code))
    }

    /// Whether `user_id` may call `method` on `path`.
    ///
    /// Stops at the first binding that matches.
    pub async fn check_api_permission(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        path: &str,
        method: &str,
    ) -> WardenResult<bool> {
        let wanted = binding_key(path, &method.to_ascii_uppercase());

        for role_id in self.user_role_ids(user_id, tenant_id).await? {
            for permission_id in self.role_permission_ids(role_id, tenant_id).await? {
                let bindings = self.api_bindings(permission_id, tenant_id).await?;
                if bindings.iter().any(|b| *b == wanted) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Permission codes held by the principal. A cached non-empty set is
    /// authoritative; anything else is recomputed.
    pub async fn user_permission_codes(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> WardenResult<Vec<String>> {
        let key = user_permission_key(user_id, tenant_id);
        let cached = self.cached_members(&key).await;
        if !cached.is_empty() {
            debug!(%user_id, %tenant_id, "permission codes served from cache");
            return Ok(cached);
        }

        let mut codes = BTreeSet::new();
        for role_id in self.user_role_ids(user_id, tenant_id).await? {
            for permission_id in self.role_permission_ids(role_id, tenant_id).await? {
                match with_deadline(
                    self.deadline,
                    "permission lookup",
                    self.permissions.get_by_id(tenant_id, permission_id),
                )
                .await
                {
                    Ok(permission) if permission.status.is_enabled() => {
                        codes.insert(permission.code);
                    }
                    Ok(_) => {}
                    // Grants may outlive the permission they point at.
                    Err(WardenError::NotFound { .. }) => {
                        debug!(%permission_id, "granted permission no longer exists");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let codes: Vec<String> = codes.into_iter().collect();
        self.populate(&key, &codes, PERMISSION_SET_TTL).await;
        Ok(codes)
    }

    /// Role ids held by the principal, straight from the store.
    async fn user_role_ids(&self, user_id: Uuid, tenant_id: Uuid) -> WardenResult<Vec<Uuid>> {
        with_deadline(
            self.deadline,
            "role lookup",
            self.roles.get_user_role_ids(tenant_id, user_id),
        )
        .await
    }

    /// Permission ids granted to a role; cache first, then the store.
    pub async fn role_permission_ids(
        &self,
        role_id: Uuid,
        tenant_id: Uuid,
    ) -> WardenResult<Vec<Uuid>> {
        let key = role_permission_key(role_id, tenant_id);
        let cached = self.cached_members(&key).await;
        if !cached.is_empty() {
            match cached
                .iter()
                .map(|id| Uuid::parse_str(id))
                .collect::<Result<Vec<_>, _>>()
            {
                Ok(ids) => return Ok(ids),
                Err(_) => warn!(%key, "unparseable cached permission ids, recomputing"),
            }
        }

        let ids = with_deadline(
            self.deadline,
            "grant lookup",
            self.permissions.get_role_permission_ids(tenant_id, role_id),
        )
        .await?;

        let members: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        self.populate(&key, &members, PERMISSION_SET_TTL).await;
        Ok(ids)
    }

    /// `path:METHOD` keys bound to a permission; cache first, then the store.
    pub async fn api_bindings(
        &self,
        permission_id: Uuid,
        tenant_id: Uuid,
    ) -> WardenResult<Vec<String>> {
        let key = api_permission_key(permission_id, tenant_id);
        let cached = self.cached_members(&key).await;
        if !cached.is_empty() {
            return Ok(cached);
        }

        let bindings: Vec<String> = with_deadline(
            self.deadline,
            "api binding lookup",
            self.api_resources.get_by_permission(tenant_id, permission_id),
        )
        .await?
        .iter()
        .map(|binding| binding.binding_key())
        .collect();

        self.populate(&key, &bindings, API_BINDING_TTL).await;
        Ok(bindings)
    }

    /// A cache read that fails counts as a miss.
    async fn cached_members(&self, key: &str) -> Vec<String> {
        match with_deadline(self.deadline, "cache read", self.cache.set_members(key)).await {
            Ok(members) => members,
            Err(e) => {
                warn!(%key, error = %e, "cache read failed, falling back to store");
                Vec::new()
            }
        }
    }

    async fn populate(&self, key: &str, members: &[String], ttl: Duration) {
        if members.is_empty() {
            return;
        }
        if let Err(e) = with_deadline(
            self.deadline,
            "cache write",
            self.cache.set_add(key, members, ttl),
        )
        .await
        {
            warn!(%key, error = %e, "failed to populate permission cache");
        }
    }
}
