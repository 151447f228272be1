//! The service graph, built once at startup and shared by reference.

use surrealdb::{Connection, Surreal};
use warden_auth::{
    AdminService, AuthConfig, AuthService, LoginCodeService, ManagementService,
    PermissionService, TenantService, TokenService,
};
use warden_core::cache::CacheStore;
use warden_db::repository::{
    SurrealAdminRepository, SurrealApiResourceRepository, SurrealPermissionRepository,
    SurrealRoleRepository, SurrealTenantRepository, SurrealTokenRepository,
    SurrealUserRepository,
};

type Tenants<Db> = SurrealTenantRepository<Db>;
type Users<Db> = SurrealUserRepository<Db>;
type Roles<Db> = SurrealRoleRepository<Db>;
type Permissions<Db> = SurrealPermissionRepository<Db>;
type ApiResources<Db> = SurrealApiResourceRepository<Db>;
type Tokens<Db> = SurrealTokenRepository<Db>;
type Admins<Db> = SurrealAdminRepository<Db>;

/// Every service, wired to one store connection and one cache.
///
/// Handed by reference to whatever transport fronts the services.
pub struct AppContext<Db, C>
where
    Db: Connection + Clone,
    C: CacheStore + Clone,
{
    pub tokens: TokenService<Tokens<Db>, C>,
    pub auth: AuthService<Tenants<Db>, Users<Db>, Roles<Db>, Tokens<Db>, C>,
    pub permissions: PermissionService<Roles<Db>, Permissions<Db>, ApiResources<Db>, C>,
    pub tenants: TenantService<Tenants<Db>>,
    pub admins: AdminService<Admins<Db>, Tenants<Db>, Tokens<Db>, C>,
    pub management: ManagementService<Users<Db>, Roles<Db>, Permissions<Db>, ApiResources<Db>>,
}

impl<Db, C> AppContext<Db, C>
where
    Db: Connection + Clone,
    C: CacheStore + Clone,
{
    pub fn new(config: &AuthConfig, client: Surreal<Db>, cache: C) -> Self {
        let deadline = config.io_deadline();

        let tenants = SurrealTenantRepository::new(client.clone());
        let users = SurrealUserRepository::new(client.clone());
        let roles = SurrealRoleRepository::new(client.clone());
        let permissions = SurrealPermissionRepository::new(client.clone());
        let api_resources = SurrealApiResourceRepository::new(client.clone());

        let tokens = TokenService::new(
            SurrealTokenRepository::new(client.clone()),
            cache.clone(),
            config.clone(),
        );
        let codes = LoginCodeService::new(cache.clone(), config.login_code_lifetime(), deadline);

        Self {
            auth: AuthService::new(
                tenants.clone(),
                users.clone(),
                roles.clone(),
                tokens.clone(),
                codes,
            ),
            permissions: PermissionService::new(
                roles.clone(),
                permissions.clone(),
                api_resources.clone(),
                cache,
                deadline,
            ),
            tenants: TenantService::new(tenants.clone(), deadline),
            admins: AdminService::new(
                SurrealAdminRepository::new(client),
                tenants,
                tokens.clone(),
            ),
            management: ManagementService::new(
                users,
                roles,
                permissions,
                api_resources,
                config.clone(),
            ),
            tokens,
        }
    }
}
