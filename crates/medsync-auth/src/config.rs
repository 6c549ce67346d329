//! Authentication configuration.

/// Configuration for the credential and session issuers.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens (HS256).
    pub signing_secret: String,
    /// Session token lifetime in seconds (default: 604_800 = 7 days).
    pub session_lifetime_secs: u64,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id verification.
    pub pepper: Option<String>,
    /// Minimum length for user-chosen passwords.
    pub min_password_length: usize,
    /// Length in bytes of the random material behind one-time passwords.
    /// Rendered base64url, so 18 bytes yield 24 characters.
    pub generated_password_bytes: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_secret: String::new(),
            session_lifetime_secs: 604_800,
            jwt_issuer: "medsync".into(),
            pepper: None,
            min_password_length: 12,
            generated_password_bytes: 18,
        }
    }
}
