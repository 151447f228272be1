//! Revocation blacklist lifetimes, driven by a paused tokio clock.
//!
//! The token inventory is faked: a no-op one where only the cache matters,
//! and one that is down.

use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use warden_auth::config::AuthConfig;
use warden_auth::token::{self, Subject};
use warden_auth::TokenService;
use warden_cache::MemoryCache;
use warden_core::cache::{CacheStore, token_blacklist_key};
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::token::{CreateTokenRecord, SubjectKind, TokenRecord, TokenType};
use warden_core::repository::TokenRepository;

#[derive(Clone)]
struct NoInventory;

impl TokenRepository for NoInventory {
    async fn create(&self, input: CreateTokenRecord) -> WardenResult<TokenRecord> {
        Ok(TokenRecord {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            subject_id: input.subject_id,
            subject_kind: input.subject_kind,
            jti: input.jti,
            token: input.token,
            token_type: input.token_type,
            expires_at: input.expires_at,
            created_at: Utc::now(),
        })
    }

    async fn list_by_subject(
        &self,
        _subject_kind: SubjectKind,
        _subject_id: Uuid,
    ) -> WardenResult<Vec<TokenRecord>> {
        Ok(Vec::new())
    }

    async fn delete_expired(&self, _now: DateTime<Utc>) -> WardenResult<u64> {
        Ok(0)
    }
}

/// An inventory whose store is down.
#[derive(Clone)]
struct DownInventory;

impl TokenRepository for DownInventory {
    async fn create(&self, _input: CreateTokenRecord) -> WardenResult<TokenRecord> {
        Err(WardenError::Transient("token store unreachable".into()))
    }

    async fn list_by_subject(
        &self,
        _subject_kind: SubjectKind,
        _subject_id: Uuid,
    ) -> WardenResult<Vec<TokenRecord>> {
        Err(WardenError::Transient("token store unreachable".into()))
    }

    async fn delete_expired(&self, _now: DateTime<Utc>) -> WardenResult<u64> {
        Err(WardenError::Transient("token store unreachable".into()))
    }
}

fn config(access_ttl: u64) -> AuthConfig {
    AuthConfig {
        access_secret: "access-test-secret".into(),
        refresh_secret: "refresh-test-secret".into(),
        access_token_lifetime_secs: access_ttl,
        ..Default::default()
    }
}

fn service(access_ttl: u64) -> (TokenService<NoInventory, MemoryCache>, MemoryCache) {
    let cache = MemoryCache::new();
    (
        TokenService::new(NoInventory, cache.clone(), config(access_ttl)),
        cache,
    )
}

#[tokio::test(start_paused = true)]
async fn revoked_token_stays_revoked_for_its_lifetime() {
    let (svc, cache) = service(3600);
    let pair = svc
        .issue_pair(&Subject::principal(Uuid::new_v4(), Uuid::new_v4(), vec![]))
        .await
        .unwrap();
    let jti = pair.access_claims.jti.clone();

    svc.revoke(&pair.access_token).await.unwrap();
    assert!(svc.is_revoked(&jti).await.unwrap());

    let ttl = cache
        .ttl(&token_blacklist_key(&jti))
        .await
        .unwrap()
        .unwrap();
    assert!(ttl <= Duration::from_secs(3600));
    assert!(ttl >= Duration::from_secs(3590));

    tokio::time::advance(Duration::from_secs(3000)).await;
    assert!(svc.is_revoked(&jti).await.unwrap());

    tokio::time::advance(Duration::from_secs(601)).await;
    assert!(!svc.is_revoked(&jti).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn blacklist_entry_is_capped_at_access_ttl() {
    // Minted under a longer-lived configuration with the same secrets.
    let long_lived = token::issue_access_token(Uuid::new_v4(), Uuid::new_v4(), &[], &config(7200))
        .unwrap();

    let (svc, cache) = service(3600);
    svc.revoke(&long_lived.token).await.unwrap();

    let ttl = cache
        .ttl(&token_blacklist_key(&long_lived.claims.jti))
        .await
        .unwrap()
        .unwrap();
    assert!(ttl <= Duration::from_secs(3600));
}

#[tokio::test(start_paused = true)]
async fn revoked_token_still_validates_structurally() {
    let (svc, _cache) = service(3600);
    let pair = svc
        .issue_pair(&Subject::principal(Uuid::new_v4(), Uuid::new_v4(), vec![]))
        .await
        .unwrap();

    svc.revoke(&pair.access_token).await.unwrap();

    let claims = token::validate_access_token(&pair.access_token, svc.config()).unwrap();
    assert!(svc.is_revoked(&claims.jti).await.unwrap());
    let err = svc.authenticate(&pair.access_token).await.unwrap_err();
    assert!(matches!(err, WardenError::InvalidToken));
}

#[tokio::test(start_paused = true)]
async fn admin_tokens_are_revocable_and_kept_apart() {
    let (svc, _cache) = service(3600);
    let pair = svc
        .issue_pair(&Subject::admin(Uuid::new_v4(), None))
        .await
        .unwrap();
    assert_eq!(pair.access_claims.subject_kind, SubjectKind::Admin);

    let err = svc.authenticate(&pair.access_token).await.unwrap_err();
    assert!(matches!(err, WardenError::InvalidToken));
    svc.authenticate_admin(&pair.access_token).await.unwrap();

    svc.revoke(&pair.access_token).await.unwrap();
    let err = svc.authenticate_admin(&pair.access_token).await.unwrap_err();
    assert!(matches!(err, WardenError::InvalidToken));
}

#[tokio::test(start_paused = true)]
async fn refresh_and_garbage_tokens_cannot_be_revoked() {
    let (svc, _cache) = service(3600);
    let pair = svc
        .issue_pair(&Subject::principal(Uuid::new_v4(), Uuid::new_v4(), vec![]))
        .await
        .unwrap();

    assert!(matches!(
        svc.revoke(&pair.refresh_token).await,
        Err(WardenError::InvalidToken)
    ));
    assert!(matches!(
        svc.revoke("garbage").await,
        Err(WardenError::InvalidToken)
    ));
    assert_eq!(pair.access_claims.token_use, TokenType::Access);
}

#[tokio::test(start_paused = true)]
async fn revoked_refresh_token_cannot_refresh() {
    let (svc, cache) = service(3600);
    let pair = svc
        .issue_pair(&Subject::principal(Uuid::new_v4(), Uuid::new_v4(), vec![]))
        .await
        .unwrap();
    let claims = token::validate_refresh_token(&pair.refresh_token, svc.config()).unwrap();
    svc.authenticate_refresh(&pair.refresh_token).await.unwrap();

    svc.revoke_claims(&claims).await.unwrap();

    let ttl = cache
        .ttl(&token_blacklist_key(&claims.jti))
        .await
        .unwrap()
        .unwrap();
    assert!(ttl > Duration::from_secs(3600));
    assert!(ttl <= Duration::from_secs(7200));
    assert!(matches!(
        svc.authenticate_refresh(&pair.refresh_token).await,
        Err(WardenError::InvalidToken)
    ));
}

#[tokio::test(start_paused = true)]
async fn inventory_failure_withholds_the_pair() {
    let svc = TokenService::new(DownInventory, MemoryCache::new(), config(3600));
    let err = svc
        .issue_pair(&Subject::principal(Uuid::new_v4(), Uuid::new_v4(), vec![]))
        .await
        .unwrap_err();
    assert!(err.is_retryable(), "got {err:?}");
    assert!(svc.purge_expired(chrono::Duration::zero()).await.unwrap_err().is_retryable());
}
