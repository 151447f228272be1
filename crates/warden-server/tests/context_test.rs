//! Drives the assembled service graph end to end against an in-memory
//! store and cache.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use warden_auth::{AuthConfig, LoginInput, NewUser, password};
use warden_cache::MemoryCache;
use warden_core::error::WardenError;
use warden_core::models::admin::{AdminScope, CreateAdmin};
use warden_core::models::permission::CreatePermission;
use warden_core::models::role::CreateRole;
use warden_core::models::tenant::CreateTenant;
use warden_core::repository::AdminRepository;
use warden_db::repository::SurrealAdminRepository;
use warden_server::AppContext;

async fn setup() -> AppContext<Db, MemoryCache> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    SurrealAdminRepository::new(db.clone())
        .create(CreateAdmin {
            username: "root".into(),
            email: None,
            password_hash: password::hash_password("root-pass", None).unwrap(),
            scope: AdminScope::System,
        })
        .await
        .unwrap();

    let config = AuthConfig {
        access_secret: "access-test-secret".into(),
        refresh_secret: "refresh-test-secret".into(),
        ..Default::default()
    };
    AppContext::new(&config, db, MemoryCache::new())
}

#[tokio::test]
async fn administrator_provisions_a_tenant_that_principals_can_use() {
    let ctx = setup().await;

    let session = ctx.admins.login("root", "root-pass").await.unwrap();
    let root = ctx
        .admins
        .authenticate(&session.tokens.access_token)
        .await
        .unwrap();

    let tenant = ctx
        .tenants
        .create(
            &root,
            CreateTenant {
                name: "acme".into(),
                description: None,
                login_method: None,
            },
        )
        .await
        .unwrap();
    ctx.tenants
        .validate_credentials(tenant.id, &tenant.secret)
        .await
        .unwrap();

    let alice = ctx
        .management
        .create_user(
            &root,
            Some(tenant.id),
            NewUser {
                username: "alice".into(),
                password: "alice-pass".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let editor = ctx
        .management
        .create_role(
            &root,
            CreateRole {
                tenant_id: tenant.id,
                name: "Editor".into(),
                code: "editor".into(),
                description: None,
            },
        )
        .await
        .unwrap();
    let read = ctx
        .management
        .create_permission(
            &root,
            CreatePermission {
                tenant_id: tenant.id,
                name: "Read documents".into(),
                code: "doc:read".into(),
                resource: "doc".into(),
                action: "read".into(),
                description: None,
            },
        )
        .await
        .unwrap();
    ctx.management
        .grant_permission(&root, Some(tenant.id), editor.id, read.id)
        .await
        .unwrap();
    ctx.management
        .assign_role(&root, Some(tenant.id), alice.id, editor.id)
        .await
        .unwrap();

    let login = ctx
        .auth
        .login(LoginInput {
            tenant_id: tenant.id,
            username: "alice".into(),
            password: "alice-pass".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(login.user.roles.len(), 1);
    assert_eq!(login.user.roles[0].code, "editor");

    let claims = ctx
        .tokens
        .authenticate(&login.tokens.access_token)
        .await
        .unwrap();
    assert_eq!(claims.subject_id().unwrap(), alice.id);

    assert!(
        ctx.permissions
            .check_user_permission(alice.id, tenant.id, "doc:read")
            .await
            .unwrap()
    );
    assert!(
        !ctx.permissions
            .check_user_permission(alice.id, tenant.id, "doc:write")
            .await
            .unwrap()
    );

    ctx.auth
        .logout(&login.tokens.access_token, Some(&login.tokens.refresh_token))
        .await
        .unwrap();
    let err = ctx
        .tokens
        .authenticate(&login.tokens.access_token)
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::InvalidToken));
}
