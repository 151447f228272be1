//! Authentication service: tenant-aware login, registration, refresh
//! and logout for principals.

use tracing::{info, warn};
use uuid::Uuid;
use warden_core::cache::CacheStore;
use warden_core::deadline::with_deadline;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::role::Role;
use warden_core::models::tenant::{LoginMethod, Tenant};
use warden_core::models::user::{CreateUser, User, UserInfo};
use warden_core::repository::{RoleRepository, TenantRepository, TokenRepository, UserRepository};

use crate::config::AuthConfig;
use crate::otp::LoginCodeService;
use crate::password;
use crate::tenant::load_available;
use crate::token::{self, Subject};
use crate::token_service::{TokenPair, TokenService};

/// Input for the login flow. Which fields are read depends on the
/// tenant's login method.
#[derive(Debug, Default)]
pub struct LoginInput {
    pub tenant_id: Uuid,
    pub username: String,
    pub password: String,
    pub phone: String,
    pub code: String,
}

/// Successful login or refresh result.
#[derive(Debug)]
pub struct LoginOutput {
    pub tokens: TokenPair,
    pub user: UserInfo,
}

/// Input for self-registration.
#[derive(Debug, Default)]
pub struct RegisterInput {
    pub tenant_id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
}

/// Authentication service.
///
/// Generic over repository and cache implementations so that the auth
/// layer has no dependency on the database or cache crates.
pub struct AuthService<Tn, U, R, T, C>
where
    Tn: TenantRepository,
    U: UserRepository,
    R: RoleRepository,
    T: TokenRepository,
    C: CacheStore,
{
    tenants: Tn,
    users: U,
    roles: R,
    tokens: TokenService<T, C>,
    codes: LoginCodeService<C>,
    config: AuthConfig,
}

impl<Tn, U, R, T, C> AuthService<Tn, U, R, T, C>
where
    Tn: TenantRepository,
    U: UserRepository,
    R: RoleRepository,
    T: TokenRepository,
    C: CacheStore,
{
    pub fn new(
        tenants: Tn,
        users: U,
        roles: R,
        tokens: TokenService<T, C>,
        codes: LoginCodeService<C>,
    ) -> Self {
        let config = tokens.config().clone();
        Self {
            tenants,
            users,
            roles,
            tokens,
            codes,
            config,
        }
    }

    /// Authenticate a principal with the tenant's configured login method
    /// and issue a token pair.
    ///
    /// Every credential mismatch is the same
    /// [`WardenError::InvalidCredentials`].
    pub async fn login(&self, input: LoginInput) -> WardenResult<LoginOutput> {
        // 1. Tenant must exist and be enabled.
        let tenant = load_available(&self.tenants, input.tenant_id, self.config.io_deadline())
            .await?;

        // 2. Verify credentials with the tenant's method.
        let user = match tenant.effective_login_method() {
            LoginMethod::Password => self.verify_password_login(&tenant, &input).await?,
            LoginMethod::Code => self.verify_code_login(&tenant, &input).await?,
        };

        // 3. Resolve current roles and issue tokens.
        let output = self.issue_for(&user).await?;
        info!(user_id = %user.id, tenant_id = %tenant.id, "principal logged in");
        Ok(output)
    }

    async fn verify_password_login(&self, tenant: &Tenant, input: &LoginInput) -> WardenResult<User> {
        if input.username.is_empty() || input.password.is_empty() {
            return Err(WardenError::validation("username and password are required"));
        }
        let user = self
            .enabled_user(with_deadline(
                self.config.io_deadline(),
                "user lookup",
                self.users.get_by_username(tenant.id, &input.username),
            ))
            .await?;

        let valid = password::verify_password(
            &input.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )
        .unwrap_or_else(|e| {
            warn!(user_id = %user.id, error = %e, "stored password hash is unusable");
            false
        });
        if !valid {
            return Err(WardenError::InvalidCredentials);
        }
        Ok(user)
    }

    async fn verify_code_login(&self, tenant: &Tenant, input: &LoginInput) -> WardenResult<User> {
        if input.phone.is_empty() || input.code.is_empty() {
            return Err(WardenError::validation("phone and code are required"));
        }
        let user = self
            .enabled_user(with_deadline(
                self.config.io_deadline(),
                "user lookup",
                self.users.get_by_phone(tenant.id, &input.phone),
            ))
            .await?;

        if !self.codes.verify(tenant.id, &input.phone, &input.code).await? {
            return Err(WardenError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Missing and disabled principals both fail as bad credentials.
    async fn enabled_user(
        &self,
        lookup: impl Future<Output = WardenResult<User>>,
    ) -> WardenResult<User> {
        match lookup.await {
            Ok(user) if user.status.is_enabled() => Ok(user),
            Ok(_) | Err(WardenError::NotFound { .. }) => Err(WardenError::InvalidCredentials),
            Err(e) => Err(e),
        }
    }

    /// Create a principal in an available tenant.
    pub async fn register(&self, input: RegisterInput) -> WardenResult<User> {
        load_available(&self.tenants, input.tenant_id, self.config.io_deadline()).await?;

        if input.username.trim().is_empty() {
            return Err(WardenError::validation("username is required"));
        }
        self.config.check_password_length(&input.password)?;

        let password_hash =
            password::hash_password(&input.password, self.config.pepper.as_deref())?;
        let user = with_deadline(
            self.config.io_deadline(),
            "user create",
            self.users.create(CreateUser {
                tenant_id: input.tenant_id,
                username: input.username,
                email: input.email.filter(|e| !e.is_empty()),
                phone: input.phone.filter(|p| !p.is_empty()),
                password_hash,
                is_super_admin: false,
            }),
        )
        .await?;

        info!(user_id = %user.id, tenant_id = %user.tenant_id, "principal registered");
        Ok(user)
    }

    /// Exchange a refresh token for a new pair. Roles are re-resolved, not
    /// copied from the old token.
    pub async fn refresh(&self, refresh_token: &str) -> WardenResult<LoginOutput> {
        let claims = self.tokens.authenticate_refresh(refresh_token).await?;
        let user_id = claims.subject_id()?;
        let tenant_id = claims
            .tenant_id()?
            .ok_or(WardenError::InvalidToken)?;

        load_available(&self.tenants, tenant_id, self.config.io_deadline()).await?;
        let user = match with_deadline(
            self.config.io_deadline(),
            "user lookup",
            self.users.get_by_id(tenant_id, user_id),
        )
        .await
        {
            Ok(user) if user.status.is_enabled() => user,
            Ok(_) | Err(WardenError::NotFound { .. }) => return Err(WardenError::InvalidToken),
            Err(e) => return Err(e),
        };

        self.issue_for(&user).await
    }

    /// End a session: revoke the access token and, when given, the
    /// refresh token issued alongside it. A refresh token that is not
    /// revoked here keeps minting pairs until it expires.
    pub async fn logout(&self, access_token: &str, refresh_token: Option<&str>) -> WardenResult<()> {
        let access = token::validate_access_token(access_token, &self.config)?;
        let refresh = refresh_token
            .map(|t| token::validate_refresh_token(t, &self.config))
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

    /// Projected view of an enabled principal and its enabled roles.
    pub async fn get_user_info(&self, tenant_id: Uuid, user_id: Uuid) -> WardenResult<UserInfo> {
        let user = with_deadline(
            self.config.io_deadline(),
            "user lookup",
            self.users.get_by_id(tenant_id, user_id),
        )
        .await?;
        if !user.status.is_enabled() {
            return Err(WardenError::not_found("user", user_id));
        }
        let (_, roles) = self.current_roles(&user).await?;
        Ok(UserInfo::new(&user, &roles))
    }

    /// The principal must be an enabled super-admin of `tenant_id`.
    pub async fn ensure_super_admin(&self, tenant_id: Uuid, user_id: Uuid) -> WardenResult<User> {
        match with_deadline(
            self.config.io_deadline(),
            "user lookup",
            self.users.get_by_id(tenant_id, user_id),
        )
        .await
        {
            Ok(user) if user.status.is_enabled() && user.is_super_admin => Ok(user),
            Ok(_) | Err(WardenError::NotFound { .. }) => {
                Err(WardenError::forbidden("super administrator required"))
            }
            Err(e) => Err(e),
        }
    }

    async fn current_roles(&self, user: &User) -> WardenResult<(Vec<Uuid>, Vec<Role>)> {
        let deadline = self.config.io_deadline();
        let role_ids = with_deadline(
            deadline,
            "role lookup",
            self.roles.get_user_role_ids(user.tenant_id, user.id),
        )
        .await?;
        let roles = with_deadline(
            deadline,
            "role lookup",
            self.roles.get_many(user.tenant_id, &role_ids),
        )
        .await?;
        Ok((role_ids, roles))
    }

    async fn issue_for(&self, user: &User) -> WardenResult<LoginOutput> {
        let (role_ids, roles) = self.current_roles(user).await?;
        let tokens = self
            .tokens
            .issue_pair(&Subject::principal(user.id, user.tenant_id, role_ids))
            .await?;
        Ok(LoginOutput {
            tokens,
            user: UserInfo::new(user, &roles),
        })
    }
}
