//! Token lifecycle: issuance with persistence, revocation and
//! authenticated-request checks.

use chrono::{Duration as ChronoDuration, Utc};
use tracing::info;
use uuid::Uuid;
use warden_core::cache::{CacheStore, token_blacklist_key};
use warden_core::deadline::with_deadline;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::token::{CreateTokenRecord, SubjectKind, TokenRecord, TokenType};
use warden_core::repository::TokenRepository;

use crate::config::AuthConfig;
use crate::token::{self, Claims, IssuedToken, Subject};

/// An access/refresh pair handed back on login and refresh.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub token_type: &'static str,
    /// Claims of the access token, for callers that log or inspect them.
    pub access_claims: Claims,
}

/// Issues, records and revokes tokens.
///
/// Revocation lives in the Cache Layer and is read on every
/// [`authenticate`](Self::authenticate) call, never from a local copy.
#[derive(Clone)]
pub struct TokenService<T: TokenRepository, C: CacheStore> {
    tokens: T,
    cache: C,
    config: AuthConfig,
}

impl<T: TokenRepository, C: CacheStore> TokenService<T, C> {
    pub fn new(tokens: T, cache: C, config: AuthConfig) -> Self {
        Self {
            tokens,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Sign an access and a refresh token for `subject` and record both.
    ///
    /// A failed record write is reported to the caller: revocation
    /// bookkeeping depends on the inventory.
    pub async fn issue_pair(&self, subject: &Subject) -> WardenResult<TokenPair> {
        let access = token::issue(subject, TokenType::Access, &self.config)?;
        let refresh = token::issue(subject, TokenType::Refresh, &self.config)?;

        self.persist(subject, &access).await?;
        self.persist(subject, &refresh).await?;

        info!(
            subject_id = %subject.id,
            subject_kind = ?subject.kind,
            jti = %access.claims.jti,
            "token pair issued"
        );

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: self.config.access_token_lifetime_secs,
            token_type: "Bearer",
            access_claims: access.claims,
        })
    }

    async fn persist(&self, subject: &Subject, issued: &IssuedToken) -> WardenResult<()> {
        let record = CreateTokenRecord {
            tenant_id: subject.tenant_id,
            subject_id: subject.id,
            subject_kind: subject.kind,
            jti: issued.claims.jti.clone(),
            token: issued.token.clone(),
            token_type: issued.claims.token_use,
            expires_at: issued.claims.expires_at(),
        };
        with_deadline(
            self.config.io_deadline(),
            "token record write",
            self.tokens.create(record),
        )
        .await?;
        Ok(())
    }

    /// Blacklist an access token until it would have expired anyway.
    ///
    /// Accepts principal and administrator access tokens. The entry lives
    /// for the token's remaining lifetime, capped at the access TTL.
    pub async fn revoke(&self, access_token: &str) -> WardenResult<()> {
        let claims = token::decode(access_token, TokenType::Access, None, &self.config)?;
        self.revoke_claims(&claims).await
    }

    /// Blacklist already-validated claims, access or refresh. The entry is
    /// capped at the lifetime configured for that token type.
    pub async fn revoke_claims(&self, claims: &Claims) -> WardenResult<()> {
        let Some(remaining) = claims.remaining_lifetime(Utc::now()) else {
            // Already expired: validation rejects it without a marker.
            return Ok(());
        };
        let cap = match claims.token_use {
            TokenType::Access => self.config.access_token_lifetime(),
            TokenType::Refresh => self.config.refresh_token_lifetime(),
        };
        let ttl = remaining.min(cap);

        with_deadline(
            self.config.io_deadline(),
            "blacklist write",
            self.cache.put(&token_blacklist_key(&claims.jti), "1", ttl),
        )
        .await?;

        info!(jti = %claims.jti, ttl_secs = ttl.as_secs(), "token revoked");
        Ok(())
    }

    pub async fn is_revoked(&self, jti: &str) -> WardenResult<bool> {
        with_deadline(
            self.config.io_deadline(),
            "blacklist read",
            self.cache.exists(&token_blacklist_key(jti)),
        )
        .await
    }

    /// Validate a principal access token and check it has not been revoked.
    pub async fn authenticate(&self, access_token: &str) -> WardenResult<Claims> {
        let claims = token::validate_access_token(access_token, &self.config)?;
        self.reject_revoked(claims).await
    }

    /// Validate an administrator access token and check it has not been
    /// revoked.
    pub async fn authenticate_admin(&self, access_token: &str) -> WardenResult<Claims> {
        let claims = token::validate_admin_access_token(access_token, &self.config)?;
        self.reject_revoked(claims).await
    }

    /// Validate a principal refresh token that has not been revoked.
    pub async fn authenticate_refresh(&self, refresh_token: &str) -> WardenResult<Claims> {
        let claims = token::validate_refresh_token(refresh_token, &self.config)?;
        self.reject_revoked(claims).await
    }

    pub async fn authenticate_admin_refresh(&self, refresh_token: &str) -> WardenResult<Claims> {
        let claims = token::validate_admin_refresh_token(refresh_token, &self.config)?;
        self.reject_revoked(claims).await
    }

    async fn reject_revoked(&self, claims: Claims) -> WardenResult<Claims> {
        if self.is_revoked(&claims.jti).await? {
            return Err(WardenError::InvalidToken);
        }
        Ok(claims)
    }

    /// Drop inventory records that expired more than `grace` ago.
    pub async fn purge_expired(&self, grace: ChronoDuration) -> WardenResult<u64> {
        let purged = with_deadline(
            self.config.io_deadline(),
            "token purge",
            self.tokens.delete_expired(Utc::now() - grace),
        )
        .await?;
        if purged > 0 {
            info!(purged, "expired token records purged");
        }
        Ok(purged)
    }

    pub async fn records_for(
        &self,
        subject_kind: SubjectKind,
        subject_id: Uuid,
    ) -> WardenResult<Vec<TokenRecord>> {
        with_deadline(
            self.config.io_deadline(),
            "token record read",
            self.tokens.list_by_subject(subject_kind, subject_id),
        )
        .await
    }
}
