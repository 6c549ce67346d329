//! Database-specific error types and conversions.

use medsync_core::error::MedsyncError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A unique index rejected the write.
    #[error("Unique constraint violated: {index}")]
    Conflict { index: String },

    /// A stored row could not be mapped onto a domain type.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    /// A stored account holds a role that is no longer issued or never was.
    #[error("Unusable role on stored account: {0}")]
    Role(String),
}

/// Unique index backing email uniqueness.
pub(crate) const EMAIL_INDEX: &str = "idx_principal_email";

impl DbError {
    /// Classify a failed statement, recognising unique index violations.
    pub(crate) fn from_statement(err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains(EMAIL_INDEX) {
            return DbError::Conflict {
                index: EMAIL_INDEX.into(),
            };
        }
        if message.contains("already contains") {
            return DbError::Conflict { index: message };
        }
        DbError::Surreal(err)
    }
}

impl From<DbError> for MedsyncError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => MedsyncError::NotFound { entity, id },
            DbError::Conflict { index } if index == EMAIL_INDEX => MedsyncError::DuplicateEmail,
            DbError::Hash(msg) => MedsyncError::Crypto(msg),
            DbError::Role(role) => MedsyncError::InvalidRole { role },
            other => MedsyncError::Database(other.to_string()),
        }
    }
}

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<uuid::Uuid, DbError> {
    uuid::Uuid::parse_str(value).map_err(|e| DbError::Corrupt(format!("invalid {field} UUID: {e}")))
}

pub(crate) fn parse_opt_uuid(
    field: &str,
    value: Option<&str>,
) -> Result<Option<uuid::Uuid>, DbError> {
    value.map(|v| parse_uuid(field, v)).transpose()
}
