//! SurrealDB implementation of [`TokenRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::token::{CreateTokenRecord, SubjectKind, TokenRecord, TokenType};
use warden_core::repository::TokenRepository;

use super::parse_uuid;
use crate::error::DbError;

const ENTITY: &str = "token";

#[derive(Debug, SurrealValue)]
struct TokenRow {
    tenant_id: Option<String>,
    subject_id: String,
    subject_kind: String,
    jti: String,
    token: String,
    token_type: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct TokenRowWithId {
    record_id: String,
    tenant_id: Option<String>,
    subject_id: String,
    subject_kind: String,
    jti: String,
    token: String,
    token_type: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct PurgedRow {
    #[allow(dead_code)]
    jti: String,
}

fn subject_kind_str(kind: SubjectKind) -> &'static str {
    match kind {
        SubjectKind::Principal => "principal",
        SubjectKind::Admin => "admin",
    }
}

fn parse_subject_kind(s: &str) -> Result<SubjectKind, DbError> {
    match s {
        "principal" => Ok(SubjectKind::Principal),
        "admin" => Ok(SubjectKind::Admin),
        other => Err(DbError::Corrupt {
            entity: ENTITY,
            message: format!("unknown subject kind: {other}"),
        }),
    }
}

fn token_type_str(token_type: TokenType) -> &'static str {
    match token_type {
        TokenType::Access => "access",
        TokenType::Refresh => "refresh",
    }
}

fn parse_token_type(s: &str) -> Result<TokenType, DbError> {
    match s {
        "access" => Ok(TokenType::Access),
        "refresh" => Ok(TokenType::Refresh),
        other => Err(DbError::Corrupt {
            entity: ENTITY,
            message: format!("unknown token type: {other}"),
        }),
    }
}

impl TokenRow {
    fn into_record(self, id: Uuid) -> Result<TokenRecord, DbError> {
        Ok(TokenRecord {
            id,
            tenant_id: self
                .tenant_id
                .as_deref()
                .map(|t| parse_uuid(ENTITY, t))
                .transpose()?,
            subject_id: parse_uuid(ENTITY, &self.subject_id)?,
            subject_kind: parse_subject_kind(&self.subject_kind)?,
            jti: self.jti,
            token: self.token,
            token_type: parse_token_type(&self.token_type)?,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

impl TokenRowWithId {
    fn try_into_record(self) -> Result<TokenRecord, DbError> {
        let id = parse_uuid(ENTITY, &self.record_id)?;
        TokenRow {
            tenant_id: self.tenant_id,
            subject_id: self.subject_id,
            subject_kind: self.subject_kind,
            jti: self.jti,
            token: self.token,
            token_type: self.token_type,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
        .into_record(id)
    }
}

/// SurrealDB implementation of the issued-token inventory.
#[derive(Clone)]
pub struct SurrealTokenRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTokenRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TokenRepository for SurrealTokenRepository<C> {
    async fn create(&self, input: CreateTokenRecord) -> WardenResult<TokenRecord> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('token', $id) SET \
                 tenant_id = $tenant_id, subject_id = $subject_id, \
                 subject_kind = $subject_kind, jti = $jti, token = $token, \
                 token_type = $token_type, expires_at = $expires_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.map(|t| t.to_string())))
            .bind(("subject_id", input.subject_id.to_string()))
            .bind(("subject_kind", subject_kind_str(input.subject_kind).to_string()))
            .bind(("jti", input.jti))
            .bind(("token", input.token))
            .bind(("token_type", token_type_str(input.token_type).to_string()))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement(ENTITY, e))?;
        let rows: Vec<TokenRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found(ENTITY, &id_str))?;

        Ok(row.into_record(id)?)
    }

    async fn list_by_subject(
        &self,
        subject_kind: SubjectKind,
        subject_id: Uuid,
    ) -> WardenResult<Vec<TokenRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM token \
                 WHERE subject_kind = $subject_kind AND subject_id = $subject_id \
                 ORDER BY created_at DESC",
            )
            .bind(("subject_kind", subject_kind_str(subject_kind).to_string()))
            .bind(("subject_id", subject_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TokenRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_record())
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> WardenResult<u64> {
        let mut result = self
            .db
            .query("DELETE token WHERE expires_at < $now RETURN BEFORE")
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;

        let purged: Vec<PurgedRow> = result.take(0).map_err(DbError::from)?;
        Ok(purged.len() as u64)
    }
}
