//! Error types for the MedSync system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MedsyncError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("An account with this email already exists")]
    DuplicateEmail,

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Access denied: {reason}")]
    Forbidden { reason: String },

    #[error("Referenced {entity} belongs to a different hospital")]
    CrossTenantReference { entity: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Role {role} requires a hospital")]
    MissingTenant { role: String },

    #[error("Invalid role: {role}")]
    InvalidRole { role: String },

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Password must be changed before continuing")]
    PasswordRotationRequired,

    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MedsyncError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }
}

pub type MedsyncResult<T> = Result<T, MedsyncError>;
