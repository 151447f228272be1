//! Two-tier administrator authorization and administrator sessions.
//!
//! System administrators may act on any tenant but must always name one.
//! App administrators act on their own tenant only; naming another one is
//! [`WardenError::Forbidden`], never a silent rescope.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;
use warden_core::cache::CacheStore;
use warden_core::deadline::with_deadline;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::admin::{Admin, AdminScope, CreateAdmin, UpdateAdmin};
use warden_core::patch::Patch;
use warden_core::repository::{
    AdminRepository, PaginatedResult, Pagination, TenantRepository, TokenRepository,
};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::tenant::load_available;
use crate::token::{self, Subject};
use crate::token_service::{TokenPair, TokenService};

/// An authenticated administrator, as far as authorization cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminPrincipal {
    pub id: Uuid,
    pub scope: AdminScope,
}

impl From<&Admin> for AdminPrincipal {
    fn from(admin: &Admin) -> Self {
        Self {
            id: admin.id,
            scope: admin.scope,
        }
    }
}

impl AdminPrincipal {
    pub fn is_system(&self) -> bool {
        matches!(self.scope, AdminScope::System)
    }

    pub fn require_system(&self) -> WardenResult<()> {
        if self.is_system() {
            Ok(())
        } else {
            Err(WardenError::forbidden("system administrator required"))
        }
    }

    /// The tenant an administrative operation may touch.
    ///
    /// Must run before any tenant-scoped query.
    pub fn resolve_target_tenant(&self, requested: Option<Uuid>) -> WardenResult<Uuid> {
        match (self.scope, requested) {
            (AdminScope::System, Some(tenant_id)) => Ok(tenant_id),
            (AdminScope::System, None) => {
                Err(WardenError::validation("target tenant is required"))
            }
            (AdminScope::App(own), None) => Ok(own),
            (AdminScope::App(own), Some(tenant_id)) if tenant_id == own => Ok(own),
            (AdminScope::App(_), Some(_)) => Err(WardenError::forbidden(
                "administrator is not bound to the requested tenant",
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisterAdmin {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub scope: AdminScope,
}

/// Profile changes a system administrator may make to an administrator.
/// Passwords go through [`AdminService::reset_password`].
#[derive(Debug, Clone, Default)]
pub struct AdminChanges {
    pub email: Patch<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct AdminLoginOutput {
    pub tokens: TokenPair,
    pub admin: Admin,
}

/// Administrator login, registration and token handling.
pub struct AdminService<Ad, Tn, T, C>
where
    Ad: AdminRepository,
    Tn: TenantRepository,
    T: TokenRepository,
    C: CacheStore,
{
    admins: Ad,
    tenants: Tn,
    tokens: TokenService<T, C>,
    config: AuthConfig,
}

impl<Ad, Tn, T, C> AdminService<Ad, Tn, T, C>
where
    Ad: AdminRepository,
    Tn: TenantRepository,
    T: TokenRepository,
    C: CacheStore,
{
    pub fn new(admins: Ad, tenants: Tn, tokens: TokenService<T, C>) -> Self {
        let config = tokens.config().clone();
        Self {
            admins,
            tenants,
            tokens,
            config,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> WardenResult<AdminLoginOutput> {
        if username.is_empty() || password.is_empty() {
            return Err(WardenError::validation("username and password are required"));
        }
        let deadline = self.config.io_deadline();

        let admin = match with_deadline(
            deadline,
            "admin lookup",
            self.admins.get_by_username(username),
        )
        .await
        {
            Ok(admin) if admin.is_active => admin,
            Ok(_) | Err(WardenError::NotFound { .. }) => {
                return Err(WardenError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        let valid = password::verify_password(
            password,
            &admin.password_hash,
            self.config.pepper.as_deref(),
        )
        .unwrap_or_else(|e| {
            warn!(admin_id = %admin.id, error = %e, "stored admin hash is unusable");
            false
        });
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }

        if let Err(e) = with_deadline(
            deadline,
            "admin login record",
            self.admins.record_login(admin.id, Utc::now()),
        )
        .await
        {
            warn!(admin_id = %admin.id, error = %e, "failed to record admin login");
        }

        let tokens = self.issue(&admin).await?;
        info!(admin_id = %admin.id, "administrator logged in");
        Ok(AdminLoginOutput { tokens, admin })
    }

    /// Only system administrators may register administrators. App
    /// administrators must be bound to an available tenant.
    pub async fn register(
        &self,
        actor: &AdminPrincipal,
        input: RegisterAdmin,
    ) -> WardenResult<Admin> {
        actor.require_system()?;
        if input.username.trim().is_empty() {
            return Err(WardenError::validation("username is required"));
        }
        self.config.check_password_length(&input.password)?;
        let deadline = self.config.io_deadline();

        if let AdminScope::App(tenant_id) = input.scope {
            load_available(&self.tenants, tenant_id, deadline).await?;
        }

        if let Some(email) = input.email.as_deref() {
            match with_deadline(deadline, "admin lookup", self.admins.get_by_email(email)).await {
                Ok(_) => {
                    return Err(WardenError::Conflict {
                        entity: "admin".into(),
                    });
                }
                Err(WardenError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        let password_hash = password::hash_password(&input.password, self.config.pepper.as_deref())?;
        let admin = with_deadline(
            deadline,
            "admin create",
            self.admins.create(CreateAdmin {
                username: input.username,
                email: input.email,
                password_hash,
                scope: input.scope,
            }),
        )
        .await?;

        info!(admin_id = %admin.id, created_by = %actor.id, "administrator registered");
        Ok(admin)
    }

    pub async fn refresh(&self, refresh_token: &str) -> WardenResult<AdminLoginOutput> {
        let claims = self.tokens.authenticate_admin_refresh(refresh_token).await?;
        let admin = self.load_active(claims.subject_id()?).await?;
        let tokens = self.issue(&admin).await?;
        Ok(AdminLoginOutput { tokens, admin })
    }

    /// Revoke the access token and, when given, its refresh token.
    pub async fn logout(&self, access_token: &str, refresh_token: Option<&str>) -> WardenResult<()> {
        let access = token::validate_admin_access_token(access_token, &self.config)?;
        let refresh = refresh_token
            .map(|t| token::validate_admin_refresh_token(t, &self.config))
            .transpose()?;
        if refresh.as_ref().is_some_and(|r| r.sub != access.sub) {
            return Err(WardenError::InvalidToken);
        }

        self.tokens.revoke_claims(&access).await?;
        if let Some(refresh) = refresh {
            self.tokens.revoke_claims(&refresh).await?;
        }
        Ok(())
    }

    /// Resolve a bearer token to the administrator behind it.
    ///
    /// Scope comes from the stored record, not the token, so a rebinding
    /// takes effect on the next request.
    pub async fn authenticate(&self, access_token: &str) -> WardenResult<AdminPrincipal> {
        let claims = self.tokens.authenticate_admin(access_token).await?;
        let admin = self.load_active(claims.subject_id()?).await?;
        Ok(AdminPrincipal::from(&admin))
    }

    /// System admins see every administrator (or those of one tenant);
    /// app admins see their own tenant's.
    pub async fn list(
        &self,
        actor: &AdminPrincipal,
        tenant_id: Option<Uuid>,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<Admin>> {
        let filter = if actor.is_system() {
            tenant_id
        } else {
            Some(actor.resolve_target_tenant(tenant_id)?)
        };
        with_deadline(
            self.config.io_deadline(),
            "admin list",
            self.admins.list(filter, pagination),
        )
        .await
    }

    /// System admins may read any administrator; app admins only those
    /// bound to their own tenant.
    pub async fn get(&self, actor: &AdminPrincipal, admin_id: Uuid) -> WardenResult<Admin> {
        let admin = self.fetch(admin_id).await?;
        if !actor.is_system() && admin.scope.tenant_id() != actor.scope.tenant_id() {
            return Err(WardenError::forbidden(
                "administrator is not bound to the requested tenant",
            ));
        }
        Ok(admin)
    }

    /// An email already held by another administrator is a conflict. An
    /// administrator cannot deactivate itself.
    pub async fn update(
        &self,
        actor: &AdminPrincipal,
        admin_id: Uuid,
        changes: AdminChanges,
    ) -> WardenResult<Admin> {
        actor.require_system()?;
        if changes.is_active == Some(false) && admin_id == actor.id {
            return Err(WardenError::validation(
                "administrators cannot deactivate themselves",
            ));
        }
        self.fetch(admin_id).await?;

        let deadline = self.config.io_deadline();
        if let Patch::Set(email) = &changes.email {
            match with_deadline(deadline, "admin lookup", self.admins.get_by_email(email)).await {
                Ok(other) if other.id != admin_id => {
                    return Err(WardenError::Conflict {
                        entity: "admin".into(),
                    });
                }
                Ok(_) | Err(WardenError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        let admin = with_deadline(
            deadline,
            "admin update",
            self.admins.update(
                admin_id,
                UpdateAdmin {
                    email: changes.email,
                    password_hash: None,
                    is_active: changes.is_active,
                },
            ),
        )
        .await?;
        info!(%admin_id, updated_by = %actor.id, "administrator updated");
        Ok(admin)
    }

    /// A deactivated administrator can no longer log in, refresh or
    /// authenticate; tokens already issued stop working on next use.
    pub async fn deactivate(&self, actor: &AdminPrincipal, admin_id: Uuid) -> WardenResult<Admin> {
        self.update(
            actor,
            admin_id,
            AdminChanges {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn reset_password(
        &self,
        actor: &AdminPrincipal,
        admin_id: Uuid,
        new_password: &str,
    ) -> WardenResult<()> {
        actor.require_system()?;
        self.config.check_password_length(new_password)?;
        self.fetch(admin_id).await?;

        let password_hash = password::hash_password(new_password, self.config.pepper.as_deref())?;
        with_deadline(
            self.config.io_deadline(),
            "admin update",
            self.admins.update(
                admin_id,
                UpdateAdmin {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            ),
        )
        .await?;
        info!(%admin_id, reset_by = %actor.id, "administrator password reset");
        Ok(())
    }

    async fn fetch(&self, admin_id: Uuid) -> WardenResult<Admin> {
        with_deadline(
            self.config.io_deadline(),
            "admin lookup",
            self.admins.get_by_id(admin_id),
        )
        .await
    }

    async fn load_active(&self, admin_id: Uuid) -> WardenResult<Admin> {
        match self.fetch(admin_id).await {
            Ok(admin) if admin.is_active => Ok(admin),
            Ok(_) | Err(WardenError::NotFound { .. }) => Err(WardenError::InvalidToken),
            Err(e) => Err(e),
        }
    }

    async fn issue(&self, admin: &Admin) -> WardenResult<TokenPair> {
        self.tokens
            .issue_pair(&Subject::admin(admin.id, admin.scope.tenant_id()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system() -> AdminPrincipal {
        AdminPrincipal {
            id: Uuid::new_v4(),
            scope: AdminScope::System,
        }
    }

    fn app(tenant_id: Uuid) -> AdminPrincipal {
        AdminPrincipal {
            id: Uuid::new_v4(),
            scope: AdminScope::App(tenant_id),
        }
    }

    #[test]
    fn system_admin_must_name_a_tenant() {
        let t2 = Uuid::new_v4();
        assert_eq!(system().resolve_target_tenant(Some(t2)).unwrap(), t2);
        assert!(matches!(
            system().resolve_target_tenant(None),
            Err(WardenError::Validation { .. })
        ));
    }

    #[test]
    fn app_admin_is_confined_to_own_tenant() {
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        let admin = app(t1);

        assert_eq!(admin.resolve_target_tenant(None).unwrap(), t1);
        assert_eq!(admin.resolve_target_tenant(Some(t1)).unwrap(), t1);
        assert!(matches!(
            admin.resolve_target_tenant(Some(t2)),
            Err(WardenError::Forbidden { .. })
        ));
    }

    #[test]
    fn only_system_admins_pass_require_system() {
        assert!(system().require_system().is_ok());
        assert!(matches!(
            app(Uuid::new_v4()).require_system(),
            Err(WardenError::Forbidden { .. })
        ));
    }
}
