//! Session claims carried by a signed token.
//!
//! Claims are never persisted. They are rebuilt from the token on every
//! request once its signature has been verified.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::principal::Principal;
use super::role::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the principal id.
    pub sub: Uuid,
    pub role: Role,
    /// Hospital reference; omitted for super-admins and unaffiliated patients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Uuid>,
    /// Mirrors the account's must-rotate flag at authentication time.
    #[serde(default, rename = "rot", skip_serializing_if = "std::ops::Not::not")]
    pub must_rotate: bool,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

impl SessionClaims {
    pub fn for_principal(principal: &Principal, issued_at: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            sub: principal.id,
            role: principal.role,
            tenant: principal.tenant_id,
            must_rotate: principal.must_rotate_password,
            iat: issued_at.timestamp(),
            exp: (issued_at + lifetime).timestamp(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}
