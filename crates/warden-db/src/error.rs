//! Database-specific error types and conversions.

use warden_core::error::WardenError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate {entity}")]
    Conflict { entity: String },

    #[error("Corrupt {entity} row: {message}")]
    Corrupt { entity: &'static str, message: String },
}

impl DbError {
    /// Classifies a failed statement: unique-index violations become
    /// [`DbError::Conflict`], anything else [`DbError::Query`].
    pub fn statement(entity: &str, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            DbError::Conflict {
                entity: entity.to_string(),
            }
        } else {
            DbError::Query(message)
        }
    }

    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<DbError> for WardenError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => WardenError::NotFound { entity, id },
            DbError::Conflict { entity } => WardenError::Conflict { entity },
            DbError::Surreal(_) | DbError::Query(_) => WardenError::Transient(err.to_string()),
            DbError::Migration(_) | DbError::Corrupt { .. } => {
                WardenError::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_are_retryable() {
        let err: WardenError = DbError::Query("connection reset".into()).into();
        assert!(err.is_retryable());
    }

    #[test]
    fn conflicts_and_misses_keep_their_meaning() {
        let err: WardenError = DbError::Conflict {
            entity: "role".into(),
        }
        .into();
        assert!(matches!(err, WardenError::Conflict { entity } if entity == "role"));

        let err: WardenError = DbError::not_found("user", "u1").into();
        assert!(matches!(err, WardenError::NotFound { .. }));
    }

    #[test]
    fn corrupt_rows_are_internal() {
        let err: WardenError = DbError::Corrupt {
            entity: "tenant",
            message: "bad uuid".into(),
        }
        .into();
        assert!(matches!(err, WardenError::Internal(_)));
    }
}
