//! Principal (login account) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;
use crate::error::{MedsyncError, MedsyncResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    /// Always stored lower-cased; see [`normalize_email`].
    pub email: String,
    /// Argon2id PHC string. Never serialized outward.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    /// Hospital reference. Absent for super-admins and unaffiliated patients.
    pub tenant_id: Option<Uuid>,
    pub contact: Option<String>,
    pub active: bool,
    /// Set for accounts holding a system-issued password.
    pub must_rotate_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreatePrincipal {
    pub name: String,
    pub email: String,
    /// Raw password (will be hashed with Argon2id before storage).
    pub password: String,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
    pub contact: Option<String>,
    pub must_rotate_password: bool,
}

/// Profile fields an administrator may change on an account.
///
/// Credentials and flags are deliberately absent: passwords go through
/// `PrincipalRepository::update_password`, activation through `set_active`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePrincipal {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
}

impl UpdatePrincipal {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.contact.is_none()
    }
}

/// Equality filters for principal listings.
#[derive(Debug, Clone, Default)]
pub struct PrincipalFilter {
    pub tenant_id: Option<Uuid>,
    pub role: Option<Role>,
}

/// Canonical form of an email address: trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal structural check applied before an address reaches the store.
pub fn validate_email(email: &str) -> MedsyncResult<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(MedsyncError::validation(format!(
            "invalid email address: {email}"
        )))
    }
}
