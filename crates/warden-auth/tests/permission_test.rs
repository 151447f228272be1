//! Integration tests for permission resolution over in-memory SurrealDB
//! and the in-process cache.

use std::time::Duration;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;
use warden_auth::PermissionService;
use warden_cache::MemoryCache;
use warden_core::cache::{
    CacheStore, api_permission_key, role_permission_key, user_permission_key,
};
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::Status;
use warden_core::models::api_resource::CreateApiResource;
use warden_core::models::permission::{CreatePermission, Permission, UpdatePermission};
use warden_core::models::role::{CreateRole, Role, UpdateRole};
use warden_core::models::tenant::CreateTenant;
use warden_core::models::user::CreateUser;
use warden_core::repository::{
    ApiResourceRepository, PaginatedResult, Pagination, PermissionRepository, RoleRepository,
    TenantRepository, UserRepository,
};
use warden_db::repository::{
    SurrealApiResourceRepository, SurrealPermissionRepository, SurrealRoleRepository,
    SurrealTenantRepository, SurrealUserRepository,
};

const DEADLINE: Duration = Duration::from_secs(3);

type Engine = PermissionService<
    SurrealRoleRepository<Db>,
    SurrealPermissionRepository<Db>,
    SurrealApiResourceRepository<Db>,
    MemoryCache,
>;

struct World {
    db: Surreal<Db>,
    engine: Engine,
    cache: MemoryCache,
    roles: SurrealRoleRepository<Db>,
    permissions: SurrealPermissionRepository<Db>,
    apis: SurrealApiResourceRepository<Db>,
    tenant_id: Uuid,
    alice: Uuid,
}

/// Tenant "t1" with a principal "alice" and no roles yet.
async fn setup() -> World {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    let tenant = SurrealTenantRepository::new(db.clone())
        .create(CreateTenant {
            name: "t1".into(),
            description: None,
            login_method: None,
        })
        .await
        .unwrap();
    let alice = add_user(&db, tenant.id, "alice").await;

    let cache = MemoryCache::new();
    let roles = SurrealRoleRepository::new(db.clone());
    let permissions = SurrealPermissionRepository::new(db.clone());
    let apis = SurrealApiResourceRepository::new(db.clone());
    let engine = PermissionService::new(
        roles.clone(),
        permissions.clone(),
        apis.clone(),
        cache.clone(),
        DEADLINE,
    );

    World {
        db,
        engine,
        cache,
        roles,
        permissions,
        apis,
        tenant_id: tenant.id,
        alice,
    }
}

async fn add_user(db: &Surreal<Db>, tenant_id: Uuid, username: &str) -> Uuid {
    SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            tenant_id,
            username: username.into(),
            email: None,
            phone: None,
            password_hash: "$argon2id$placeholder".into(),
            is_super_admin: false,
        })
        .await
        .unwrap()
        .id
}

impl World {
    async fn role(&self, code: &str) -> Role {
        self.roles
            .create(CreateRole {
                tenant_id: self.tenant_id,
                name: code.into(),
                code: code.into(),
                description: None,
            })
            .await
            .unwrap()
    }

    async fn permission(&self, code: &str) -> Permission {
        let (resource, action) = code.split_once(':').unwrap();
        self.permissions
            .create(CreatePermission {
                tenant_id: self.tenant_id,
                name: code.into(),
                code: code.into(),
                resource: resource.into(),
                action: action.into(),
                description: None,
            })
            .await
            .unwrap()
    }

    async fn grant(&self, role: &Role, permission: &Permission) {
        self.permissions
            .grant_to_role(self.tenant_id, role.id, permission.id)
            .await
            .unwrap();
    }

    async fn assign(&self, user_id: Uuid, role: &Role) {
        self.roles
            .assign_to_user(self.tenant_id, user_id, role.id)
            .await
            .unwrap();
    }

    async fn bind(&self, path: &str, method: &str, permission: &Permission) {
        self.apis
            .create(CreateApiResource {
                tenant_id: self.tenant_id,
                path: path.into(),
                method: method.into(),
                description: None,
                permission_id: permission.id,
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn editor_can_write_but_not_delete() {
    let w = setup().await;
    let editor = w.role("editor").await;
    let write = w.permission("doc:write").await;
    w.grant(&editor, &write).await;
    w.assign(w.alice, &editor).await;

    assert!(
        w.engine
            .check_user_permission(w.alice, w.tenant_id, "doc:write")
            .await
            .unwrap()
    );
    assert!(
        !w.engine
            .check_user_permission(w.alice, w.tenant_id, "doc:delete")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn resolution_populates_each_layer() {
    let w = setup().await;
    let editor = w.role("editor").await;
    let write = w.permission("doc:write").await;
    w.grant(&editor, &write).await;
    w.assign(w.alice, &editor).await;

    w.engine
        .check_user_permission(w.alice, w.tenant_id, "doc:write")
        .await
        .unwrap();

    let codes = w
        .cache
        .set_members(&user_permission_key(w.alice, w.tenant_id))
        .await
        .unwrap();
    assert_eq!(codes, vec!["doc:write".to_string()]);

    let role_key = role_permission_key(editor.id, w.tenant_id);
    let ids = w.cache.set_members(&role_key).await.unwrap();
    assert_eq!(ids, vec![write.id.to_string()]);

    let ttl = w.cache.ttl(&role_key).await.unwrap().unwrap();
    assert!(ttl <= Duration::from_secs(12 * 60 * 60));
    assert!(ttl > Duration::from_secs(11 * 60 * 60));
}

#[tokio::test]
async fn cache_hit_and_miss_agree() {
    let w = setup().await;
    let editor = w.role("editor").await;
    let write = w.permission("doc:write").await;
    w.grant(&editor, &write).await;
    w.assign(w.alice, &editor).await;

    let mut answers = Vec::new();
    for code in ["doc:write", "doc:delete", "doc:write", "doc:delete"] {
        answers.push(
            w.engine
                .check_user_permission(w.alice, w.tenant_id, code)
                .await
                .unwrap(),
        );
    }
    assert_eq!(answers, vec![true, false, true, false]);
}

#[tokio::test]
async fn cached_set_is_authoritative_until_it_expires() {
    let w = setup().await;
    let editor = w.role("editor").await;
    let write = w.permission("doc:write").await;
    w.grant(&editor, &write).await;
    w.assign(w.alice, &editor).await;

    assert!(
        w.engine
            .check_user_permission(w.alice, w.tenant_id, "doc:write")
            .await
            .unwrap()
    );

    w.roles
        .unassign_from_user(w.tenant_id, w.alice, editor.id)
        .await
        .unwrap();

    // Still inside the consistency window.
    assert!(
        w.engine
            .check_user_permission(w.alice, w.tenant_id, "doc:write")
            .await
            .unwrap()
    );

    w.cache
        .delete(&user_permission_key(w.alice, w.tenant_id))
        .await
        .unwrap();
    assert!(
        !w.engine
            .check_user_permission(w.alice, w.tenant_id, "doc:write")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn empty_results_are_not_cached() {
    let w = setup().await;
    let bob = add_user(&w.db, w.tenant_id, "bob").await;
    let lonely = w.role("lonely").await;
    w.assign(bob, &lonely).await;

    assert!(
        !w.engine
            .check_user_permission(bob, w.tenant_id, "doc:write")
            .await
            .unwrap()
    );
    assert!(
        !w.cache
            .exists(&user_permission_key(bob, w.tenant_id))
            .await
            .unwrap()
    );
    assert!(
        !w.cache
            .exists(&role_permission_key(lonely.id, w.tenant_id))
            .await
            .unwrap()
    );

    // A grant made right after the empty read is picked up immediately.
    let write = w.permission("doc:write").await;
    w.grant(&lonely, &write).await;
    assert!(
        w.engine
            .check_user_permission(bob, w.tenant_id, "doc:write")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn disabled_permissions_and_roles_confer_nothing() {
    let w = setup().await;
    let editor = w.role("editor").await;
    let read = w.permission("doc:read").await;
    let write = w.permission("doc:write").await;
    w.grant(&editor, &read).await;
    w.grant(&editor, &write).await;
    w.assign(w.alice, &editor).await;

    w.permissions
        .update(
            w.tenant_id,
            read.id,
            UpdatePermission {
                status: Some(Status::Disabled),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let codes = w
        .engine
        .user_permission_codes(w.alice, w.tenant_id)
        .await
        .unwrap();
    assert_eq!(codes, vec!["doc:write".to_string()]);

    w.cache
        .delete(&user_permission_key(w.alice, w.tenant_id))
        .await
        .unwrap();
    w.roles
        .update(
            w.tenant_id,
            editor.id,
            UpdateRole {
                status: Some(Status::Disabled),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(
        !w.engine
            .check_user_permission(w.alice, w.tenant_id, "doc:write")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn viewer_may_get_but_not_post_reports() {
    let w = setup().await;
    let viewer = w.role("viewer").await;
    let read = w.permission("report:read").await;
    w.grant(&viewer, &read).await;
    w.bind("/reports", "GET", &read).await;
    w.assign(w.alice, &viewer).await;

    assert!(
        w.engine
            .check_api_permission(w.alice, w.tenant_id, "/reports", "GET")
            .await
            .unwrap()
    );
    assert!(
        !w.engine
            .check_api_permission(w.alice, w.tenant_id, "/reports", "POST")
            .await
            .unwrap()
    );
    // Methods compare case-insensitively; paths do not.
    assert!(
        w.engine
            .check_api_permission(w.alice, w.tenant_id, "/reports", "get")
            .await
            .unwrap()
    );
    assert!(
        !w.engine
            .check_api_permission(w.alice, w.tenant_id, "/Reports", "GET")
            .await
            .unwrap()
    );

    let key = api_permission_key(read.id, w.tenant_id);
    assert_eq!(
        w.cache.set_members(&key).await.unwrap(),
        vec!["/reports:GET".to_string()]
    );
    let ttl = w.cache.ttl(&key).await.unwrap().unwrap();
    assert!(ttl > Duration::from_secs(23 * 60 * 60));
}

#[tokio::test]
async fn api_check_without_roles_is_false() {
    let w = setup().await;
    assert!(
        !w.engine
            .check_api_permission(w.alice, w.tenant_id, "/reports", "GET")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn tenants_do_not_share_grants() {
    let w = setup().await;
    let editor = w.role("editor").await;
    let write = w.permission("doc:write").await;
    w.grant(&editor, &write).await;
    w.assign(w.alice, &editor).await;

    let elsewhere = Uuid::new_v4();
    assert!(
        !w.engine
            .check_user_permission(w.alice, elsewhere, "doc:write")
            .await
            .unwrap()
    );
}

/// A cache that is down for everything.
#[derive(Clone)]
struct DownCache;

fn cache_down() -> WardenError {
    WardenError::Transient("cache unreachable".into())
}

impl CacheStore for DownCache {
    async fn set_members(&self, _key: &str) -> WardenResult<Vec<String>> {
        Err(cache_down())
    }
    async fn set_add(&self, _key: &str, _members: &[String], _ttl: Duration) -> WardenResult<()> {
        Err(cache_down())
    }
    async fn put(&self, _key: &str, _value: &str, _ttl: Duration) -> WardenResult<()> {
        Err(cache_down())
    }
    async fn get(&self, _key: &str) -> WardenResult<Option<String>> {
        Err(cache_down())
    }
    async fn take(&self, _key: &str) -> WardenResult<Option<String>> {
        Err(cache_down())
    }
    async fn exists(&self, _key: &str) -> WardenResult<bool> {
        Err(cache_down())
    }
    async fn ttl(&self, _key: &str) -> WardenResult<Option<Duration>> {
        Err(cache_down())
    }
    async fn delete(&self, _key: &str) -> WardenResult<()> {
        Err(cache_down())
    }
}

#[tokio::test]
async fn cache_outage_falls_back_to_the_store() {
    let w = setup().await;
    let viewer = w.role("viewer").await;
    let read = w.permission("report:read").await;
    w.grant(&viewer, &read).await;
    w.bind("/reports", "GET", &read).await;
    w.assign(w.alice, &viewer).await;

    let engine = PermissionService::new(
        w.roles.clone(),
        w.permissions.clone(),
        w.apis.clone(),
        DownCache,
        DEADLINE,
    );
    assert!(
        engine
            .check_user_permission(w.alice, w.tenant_id, "report:read")
            .await
            .unwrap()
    );
    assert!(
        engine
            .check_api_permission(w.alice, w.tenant_id, "/reports", "GET")
            .await
            .unwrap()
    );
}

/// A role store that is down for everything.
#[derive(Clone)]
struct DownRoles;

fn store_down() -> WardenError {
    WardenError::Transient("store unreachable".into())
}

impl RoleRepository for DownRoles {
    async fn create(&self, _input: CreateRole) -> WardenResult<Role> {
        Err(store_down())
    }
    async fn get_by_id(&self, _tenant_id: Uuid, _id: Uuid) -> WardenResult<Role> {
        Err(store_down())
    }
    async fn get_many(&self, _tenant_id: Uuid, _ids: &[Uuid]) -> WardenResult<Vec<Role>> {
        Err(store_down())
    }
    async fn update(&self, _tenant_id: Uuid, _id: Uuid, _input: UpdateRole) -> WardenResult<Role> {
        Err(store_down())
    }
    async fn delete(&self, _tenant_id: Uuid, _id: Uuid) -> WardenResult<()> {
        Err(store_down())
    }
    async fn list(
        &self,
        _tenant_id: Uuid,
        _pagination: Pagination,
    ) -> WardenResult<PaginatedResult<Role>> {
        Err(store_down())
    }
    async fn assign_to_user(&self, _t: Uuid, _u: Uuid, _r: Uuid) -> WardenResult<()> {
        Err(store_down())
    }
    async fn unassign_from_user(&self, _t: Uuid, _u: Uuid, _r: Uuid) -> WardenResult<()> {
        Err(store_down())
    }
    async fn get_user_role_ids(&self, _tenant_id: Uuid, _user_id: Uuid) -> WardenResult<Vec<Uuid>> {
        Err(store_down())
    }
}

#[tokio::test]
async fn store_outage_is_an_error_not_a_denial() {
    let w = setup().await;
    let engine = PermissionService::new(
        DownRoles,
        w.permissions.clone(),
        w.apis.clone(),
        w.cache.clone(),
        DEADLINE,
    );

    let err = engine
        .check_user_permission(w.alice, w.tenant_id, "doc:write")
        .await
        .unwrap_err();
    assert!(err.is_retryable(), "got {err:?}");

    let err = engine
        .check_api_permission(w.alice, w.tenant_id, "/reports", "GET")
        .await
        .unwrap_err();
    assert!(err.is_retryable(), "got {err:?}");
}
