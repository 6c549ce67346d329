//! Session issuer: password login and stateless token validation.

use chrono::{Duration, Utc};
use medsync_core::error::{MedsyncError, MedsyncResult};
use medsync_core::models::principal::normalize_email;
use medsync_core::models::session::SessionClaims;
use medsync_core::repository::PrincipalRepository;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Successful login result.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedSession {
    /// Signed session token.
    pub token: String,
    pub claims: SessionClaims,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// Session issuer.
///
/// Generic over the principal store so that the auth layer has no
/// dependency on the database crate.
pub struct SessionIssuer<P: PrincipalRepository> {
    principals: P,
    config: AuthConfig,
}

impl<P: PrincipalRepository> SessionIssuer<P> {
    pub fn new(principals: P, config: AuthConfig) -> Self {
        Self { principals, config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Verify email and password, then sign a session token.
    ///
    /// Unknown email, an account that cannot be loaded (such as one holding
    /// a retired role) and a wrong password all produce the same error, and
    /// each does one Argon2 verification.
    pub async fn authenticate(
        &self,
        email: &str,
        raw_password: &str,
    ) -> MedsyncResult<AuthenticatedSession> {
        let pepper = self.config.pepper.as_deref();
        let email = normalize_email(email);

        // 1. Look up the account.
        let principal = match self.principals.get_by_email(&email).await {
            Ok(p) => p,
            Err(e @ MedsyncError::Database(_)) => return Err(e),
            // Accounts that cannot be loaded look exactly like unknown ones.
            Err(e) => {
                password::verify_decoy(raw_password, pepper);
                match e {
                    MedsyncError::InvalidRole { role } => {
                        warn!(%role, "Login attempt for account with a retired role");
                    }
                    _ => debug!("Login attempt for unknown email"),
                }
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        // 2. Verify password.
        let valid = password::verify_password(raw_password, &principal.password_hash, pepper)?;
        if !valid {
            debug!(principal_id = %principal.id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        // 3. Check account status.
        if !principal.active {
            return Err(AuthError::AccountInactive.into());
        }

        // 4. Sign.
        let lifetime = Duration::seconds(
            i64::try_from(self.config.session_lifetime_secs)
                .map_err(|_| MedsyncError::Internal("session lifetime out of range".into()))?,
        );
        let claims = SessionClaims::for_principal(&principal, Utc::now(), lifetime);
        let token = token::issue_token(&claims, &self.config)?;

        info!(
            principal_id = %principal.id,
            role = %principal.role,
            must_rotate = principal.must_rotate_password,
            "Session issued"
        );

        Ok(AuthenticatedSession {
            token,
            claims,
            expires_in: self.config.session_lifetime_secs,
        })
    }

    /// Verify a presented token and return its claims.
    pub fn validate(&self, token: &str) -> MedsyncResult<SessionClaims> {
        Ok(token::validate_token(token, &self.config)?)
    }
}
