//! HS256 JWT issuance and verification for principal and administrator
//! tokens.
//!
//! Access and refresh tokens are signed with separate secrets. Every token
//! carries a `token_use` and a `subject_kind` claim; a token presented for
//! the wrong use or by the wrong kind of subject is rejected even when its
//! signature verifies.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::models::token::{SubjectKind, TokenType};

use crate::config::AuthConfig;
use crate::error::AuthError;

/// JWT claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject: principal or administrator ID (UUID string).
    pub sub: String,
    /// Tenant ID. Absent for system administrators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Role IDs held at issuance. Empty on refresh tokens.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Unique token ID; the revocation key.
    pub jti: String,
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub token_use: TokenType,
    pub subject_kind: SubjectKind,
}

impl Claims {
    pub fn subject_id(&self) -> Result<Uuid, AuthError> {
        parse_claim_id("sub", &self.sub)
    }

    pub fn tenant_id(&self) -> Result<Option<Uuid>, AuthError> {
        self.tenant_id
            .as_deref()
            .map(|id| parse_claim_id("tenant_id", id))
            .transpose()
    }

    pub fn role_ids(&self) -> Result<Vec<Uuid>, AuthError> {
        self.roles
            .iter()
            .map(|id| parse_claim_id("roles", id))
            .collect()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Time left before expiry, `None` once expired.
    pub fn remaining_lifetime(&self, now: DateTime<Utc>) -> Option<Duration> {
        let left = self.exp - now.timestamp();
        (left > 0).then(|| Duration::from_secs(left as u64))
    }
}

fn parse_claim_id(claim: &str, value: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(value).map_err(|_| AuthError::TokenInvalid(format!("malformed {claim} claim")))
}

/// Who a token is issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: Uuid,
    pub kind: SubjectKind,
    pub tenant_id: Option<Uuid>,
    pub role_ids: Vec<Uuid>,
}

impl Subject {
    pub fn principal(user_id: Uuid, tenant_id: Uuid, role_ids: Vec<Uuid>) -> Self {
        Self {
            id: user_id,
            kind: SubjectKind::Principal,
            tenant_id: Some(tenant_id),
            role_ids,
        }
    }

    pub fn admin(admin_id: Uuid, tenant_id: Option<Uuid>) -> Self {
        Self {
            id: admin_id,
            kind: SubjectKind::Admin,
            tenant_id,
            role_ids: Vec::new(),
        }
    }
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

fn secret_for(token_use: TokenType, config: &AuthConfig) -> &[u8] {
    match token_use {
        TokenType::Access => config.access_secret.as_bytes(),
        TokenType::Refresh => config.refresh_secret.as_bytes(),
    }
}

fn lifetime_for(token_use: TokenType, config: &AuthConfig) -> i64 {
    let secs = match token_use {
        TokenType::Access => config.access_token_lifetime_secs,
        TokenType::Refresh => config.refresh_token_lifetime_secs,
    };
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// Sign a token of the given use for `subject`.
pub fn issue(
    subject: &Subject,
    token_use: TokenType,
    config: &AuthConfig,
) -> Result<IssuedToken, AuthError> {
    let secret = secret_for(token_use, config);
    if secret.is_empty() {
        return Err(AuthError::Misconfigured("signing secret is empty".into()));
    }

    let now = Utc::now().timestamp();
    let roles = match token_use {
        TokenType::Access => subject.role_ids.iter().map(Uuid::to_string).collect(),
        TokenType::Refresh => Vec::new(),
    };
    let claims = Claims {
        sub: subject.id.to_string(),
        tenant_id: subject.tenant_id.map(|t| t.to_string()),
        roles,
        jti: Uuid::new_v4().to_string(),
        iss: config.jwt_issuer.clone(),
        iat: now,
        nbf: now,
        exp: now.saturating_add(lifetime_for(token_use, config)),
        token_use,
        subject_kind: subject.kind,
    };

    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))?;

    Ok(IssuedToken { token, claims })
}

/// Issue a principal access token embedding the role set.
pub fn issue_access_token(
    user_id: Uuid,
    tenant_id: Uuid,
    role_ids: &[Uuid],
    config: &AuthConfig,
) -> Result<IssuedToken, AuthError> {
    let subject = Subject::principal(user_id, tenant_id, role_ids.to_vec());
    issue(&subject, TokenType::Access, config)
}

/// Issue a principal refresh token.
pub fn issue_refresh_token(
    user_id: Uuid,
    tenant_id: Uuid,
    config: &AuthConfig,
) -> Result<IssuedToken, AuthError> {
    issue(
        &Subject::principal(user_id, tenant_id, Vec::new()),
        TokenType::Refresh,
        config,
    )
}

/// Verify signature, algorithm, issuer, `nbf` and `exp`, then check the
/// token is meant for `token_use` and (when given) `subject_kind`.
pub fn decode(
    token: &str,
    token_use: TokenType,
    subject_kind: Option<SubjectKind>,
    config: &AuthConfig,
) -> Result<Claims, AuthError> {
    let secret = secret_for(token_use, config);
    if secret.is_empty() {
        return Err(AuthError::Misconfigured("signing secret is empty".into()));
    }

    // Only HS256 is accepted; a header naming any other algorithm fails.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "nbf", "iat", "iss"]);
    validation.validate_nbf = true;
    validation.leeway = 0;

    let claims = jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::TokenInvalid(e.to_string()))?;

    if claims.token_use != token_use {
        return Err(AuthError::TokenInvalid("wrong token use".into()));
    }
    if subject_kind.is_some_and(|kind| kind != claims.subject_kind) {
        return Err(AuthError::TokenInvalid("wrong subject kind".into()));
    }
    Ok(claims)
}

pub fn validate_access_token(token: &str, config: &AuthConfig) -> Result<Claims, AuthError> {
    decode(token, TokenType::Access, Some(SubjectKind::Principal), config)
}

pub fn validate_refresh_token(token: &str, config: &AuthConfig) -> Result<Claims, AuthError> {
    decode(token, TokenType::Refresh, Some(SubjectKind::Principal), config)
}

pub fn validate_admin_access_token(token: &str, config: &AuthConfig) -> Result<Claims, AuthError> {
    decode(token, TokenType::Access, Some(SubjectKind::Admin), config)
}

pub fn validate_admin_refresh_token(
    token: &str,
    config: &AuthConfig,
) -> Result<Claims, AuthError> {
    decode(token, TokenType::Refresh, Some(SubjectKind::Admin), config)
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            access_secret: "access-test-secret".into(),
            refresh_secret: "refresh-test-secret".into(),
            jwt_issuer: "auth-center-test".into(),
            ..Default::default()
        }
    }

    fn sign(claims: &Claims, alg: Algorithm, secret: &str) -> String {
        jsonwebtoken::encode(
            &Header::new(alg),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn jwt_roundtrip() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let roles = vec![Uuid::new_v4(), Uuid::new_v4()];

        let issued = issue_access_token(user_id, tenant_id, &roles, &config).unwrap();
        let claims = validate_access_token(&issued.token, &config).unwrap();

        assert_eq!(claims, issued.claims);
        assert_eq!(claims.subject_id().unwrap(), user_id);
        assert_eq!(claims.tenant_id().unwrap(), Some(tenant_id));
        assert_eq!(claims.role_ids().unwrap(), roles);
        assert_eq!(claims.iss, "auth-center-test");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.nbf, claims.iat);
    }

    #[test]
    fn jti_is_unique() {
        let config = test_config();
        let uid = Uuid::new_v4();
        let tid = Uuid::new_v4();

        let t1 = issue_access_token(uid, tid, &[], &config).unwrap();
        let t2 = issue_access_token(uid, tid, &[], &config).unwrap();
        assert_ne!(t1.claims.jti, t2.claims.jti);
    }

    #[test]
    fn refresh_token_uses_its_own_secret() {
        let config = test_config();
        let refresh = issue_refresh_token(Uuid::new_v4(), Uuid::new_v4(), &config).unwrap();

        assert!(refresh.claims.roles.is_empty());
        assert_eq!(refresh.claims.exp - refresh.claims.iat, 7200);
        assert!(validate_refresh_token(&refresh.token, &config).is_ok());
        assert!(validate_access_token(&refresh.token, &config).is_err());

        let access = issue_access_token(Uuid::new_v4(), Uuid::new_v4(), &[], &config).unwrap();
        assert!(validate_refresh_token(&access.token, &config).is_err());
    }

    #[test]
    fn admin_and_principal_tokens_do_not_mix() {
        let config = test_config();
        let admin = issue(
            &Subject::admin(Uuid::new_v4(), None),
            TokenType::Access,
            &config,
        )
        .unwrap();
        assert!(validate_admin_access_token(&admin.token, &config).is_ok());
        assert!(validate_access_token(&admin.token, &config).is_err());

        let principal = issue_access_token(Uuid::new_v4(), Uuid::new_v4(), &[], &config).unwrap();
        assert!(validate_admin_access_token(&principal.token, &config).is_err());
    }

    #[test]
    fn other_algorithms_are_rejected() {
        let config = test_config();
        let issued = issue_access_token(Uuid::new_v4(), Uuid::new_v4(), &[], &config).unwrap();
        let forged = sign(&issued.claims, Algorithm::HS512, &config.access_secret);

        assert!(matches!(
            validate_access_token(&forged, &config),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();
        let mut claims = issue_access_token(Uuid::new_v4(), Uuid::new_v4(), &[], &config)
            .unwrap()
            .claims;
        claims.iat -= 7200;
        claims.nbf -= 7200;
        claims.exp = Utc::now().timestamp() - 10;
        let token = sign(&claims, Algorithm::HS256, &config.access_secret);

        assert!(validate_access_token(&token, &config).is_err());
        assert_eq!(claims.remaining_lifetime(Utc::now()), None);
    }

    #[test]
    fn not_yet_valid_token_is_rejected() {
        let config = test_config();
        let mut claims = issue_access_token(Uuid::new_v4(), Uuid::new_v4(), &[], &config)
            .unwrap()
            .claims;
        claims.nbf += 600;
        let token = sign(&claims, Algorithm::HS256, &config.access_secret);

        assert!(validate_access_token(&token, &config).is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = test_config();
        let issued = issue_access_token(Uuid::new_v4(), Uuid::new_v4(), &[], &config).unwrap();
        let forged = sign(&issued.claims, Algorithm::HS256, "someone-elses-secret");

        assert!(validate_access_token(&forged, &config).is_err());
        assert!(validate_access_token("not.a.jwt", &config).is_err());
    }

    #[test]
    fn empty_secret_fails_issuance() {
        let config = AuthConfig::default();
        let result = issue_access_token(Uuid::new_v4(), Uuid::new_v4(), &[], &config);
        assert!(matches!(result, Err(AuthError::Misconfigured(_))));
    }

    #[test]
    fn remaining_lifetime_counts_down() {
        let config = test_config();
        let issued = issue_access_token(Uuid::new_v4(), Uuid::new_v4(), &[], &config).unwrap();
        let left = issued.claims.remaining_lifetime(Utc::now()).unwrap();
        assert!(left <= Duration::from_secs(3600));
        assert!(left >= Duration::from_secs(3590));
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer   abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
