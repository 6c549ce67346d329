//! Session token issuance and verification (HS256 JWT).

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use medsync_core::models::session::SessionClaims;
use serde::Serialize;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Wire form: the session claims plus the issuer. Decoding ignores `iss`
/// once validation has checked it.
#[derive(Serialize)]
struct OutgoingClaims<'a> {
    #[serde(flatten)]
    claims: &'a SessionClaims,
    iss: &'a str,
}

/// Sign `claims` with the configured secret.
pub fn issue_token(claims: &SessionClaims, config: &AuthConfig) -> Result<String, AuthError> {
    if config.signing_secret.is_empty() {
        return Err(AuthError::Crypto("signing secret is not configured".into()));
    }
    let key = EncodingKey::from_secret(config.signing_secret.as_bytes());
    let wire = OutgoingClaims {
        claims,
        iss: &config.jwt_issuer,
    };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &wire, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Verify signature, issuer and expiry, then return the claims.
///
/// The signature is checked before any claim is interpreted. No leeway is
/// granted on expiry. Purely stateless: no store lookup happens here.
pub fn validate_token(token: &str, config: &AuthConfig) -> Result<SessionClaims, AuthError> {
    if config.signing_secret.is_empty() {
        return Err(AuthError::Crypto("signing secret is not configured".into()));
    }
    let key = DecodingKey::from_secret(config.signing_secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    jsonwebtoken::decode::<SessionClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}
