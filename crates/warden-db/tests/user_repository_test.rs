//! Integration tests for the User repository using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;
use warden_core::error::WardenError;
use warden_core::models::Status;
use warden_core::models::tenant::CreateTenant;
use warden_core::models::user::{CreateUser, UpdateUser};
use warden_core::patch::Patch;
use warden_core::repository::{Pagination, TenantRepository, UserRepository};
use warden_db::repository::{SurrealTenantRepository, SurrealUserRepository};

async fn setup() -> (SurrealUserRepository<Db>, Uuid) {
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

    (SurrealUserRepository::new(db), tenant.id)
}

fn new_user(tenant_id: Uuid, username: &str, email: Option<&str>) -> CreateUser {
    CreateUser {
        tenant_id,
        username: username.into(),
        email: email.map(Into::into),
        phone: None,
        password_hash: "$argon2id$placeholder".into(),
        is_super_admin: false,
    }
}

#[tokio::test]
async fn create_and_look_up_user() {
    let (repo, tenant_id) = setup().await;

    let mut input = new_user(tenant_id, "alice", Some("alice@example.com"));
    input.phone = Some("+15550100".into());
    let user = repo.create(input).await.unwrap();
    assert_eq!(user.tenant_id, tenant_id);
    assert_eq!(user.status, Status::Enabled);

    let by_id = repo.get_by_id(tenant_id, user.id).await.unwrap();
    assert_eq!(by_id.username, "alice");

    let by_name = repo.get_by_username(tenant_id, "alice").await.unwrap();
    assert_eq!(by_name.id, user.id);

    let by_email = repo.get_by_email(tenant_id, "alice@example.com").await.unwrap();
    assert_eq!(by_email.id, user.id);

    let by_phone = repo.get_by_phone(tenant_id, "+15550100").await.unwrap();
    assert_eq!(by_phone.id, user.id);
}

#[tokio::test]
async fn users_are_isolated_by_tenant() {
    let (repo, tenant_id) = setup().await;
    let user = repo.create(new_user(tenant_id, "alice", None)).await.unwrap();

    let other_tenant = Uuid::new_v4();
    let err = repo.get_by_id(other_tenant, user.id).await.unwrap_err();
    assert!(matches!(err, WardenError::NotFound { .. }));
    assert!(repo.get_by_username(other_tenant, "alice").await.is_err());
}

#[tokio::test]
async fn duplicate_username_and_email_conflict() {
    let (repo, tenant_id) = setup().await;
    repo.create(new_user(tenant_id, "alice", Some("a@example.com")))
        .await
        .unwrap();

    let err = repo
        .create(new_user(tenant_id, "alice", None))
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::Conflict { .. }), "got {err:?}");

    let err = repo
        .create(new_user(tenant_id, "bob", Some("a@example.com")))
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::Conflict { .. }), "got {err:?}");

    // Several users may leave email unset.
    repo.create(new_user(tenant_id, "carol", None)).await.unwrap();
    repo.create(new_user(tenant_id, "dave", None)).await.unwrap();
}

#[tokio::test]
async fn update_clears_and_sets_contact_fields() {
    let (repo, tenant_id) = setup().await;
    let user = repo
        .create(new_user(tenant_id, "alice", Some("a@example.com")))
        .await
        .unwrap();

    let updated = repo
        .update(
            tenant_id,
            user.id,
            UpdateUser {
                email: Patch::Clear,
                phone: Patch::Set("+15550101".into()),
                is_super_admin: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.email, None);
    assert_eq!(updated.phone.as_deref(), Some("+15550101"));
    assert!(updated.is_super_admin);
    assert_eq!(updated.username, "alice");
}

#[tokio::test]
async fn delete_disables_instead_of_removing() {
    let (repo, tenant_id) = setup().await;
    let user = repo.create(new_user(tenant_id, "alice", None)).await.unwrap();
    repo.create(new_user(tenant_id, "bob", None)).await.unwrap();

    repo.delete(tenant_id, user.id).await.unwrap();

    let fetched = repo.get_by_id(tenant_id, user.id).await.unwrap();
    assert_eq!(fetched.status, Status::Disabled);

    let page = repo.list(tenant_id, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 2);
}
