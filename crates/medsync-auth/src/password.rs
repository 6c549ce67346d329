//! Password verification, one-time password generation and password policy.

use argon2::{Argon2, PasswordVerifier};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use medsync_core::error::{MedsyncError, MedsyncResult};

use crate::error::AuthError;

/// Well-formed Argon2id hash that no password matches. Verified against when
/// an email is unknown so both failure paths do the same amount of work.
const DECOY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$\
AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// If `pepper` is provided it is prepended to the password before
/// verification; this must match the pepper used during hashing.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if the stored hash is malformed.
pub fn verify_password(
    password: &str,
    hash: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    let argon2 = Argon2::default();
    match argon2.verify_password(input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

/// Run a verification whose outcome is discarded.
pub fn verify_decoy(password: &str, pepper: Option<&str>) {
    let _ = verify_password(password, DECOY_HASH, pepper);
}

/// Generate a one-time password from the OS CSPRNG, base64url-encoded
/// without padding.
pub fn generate_password(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes.max(9)];
    rand::fill(buf.as_mut_slice());
    URL_SAFE_NO_PAD.encode(buf)
}

/// Enforce the minimum length for a user-chosen password.
pub fn check_policy(password: &str, min_length: usize) -> MedsyncResult<()> {
    if password.chars().count() < min_length {
        return Err(MedsyncError::PasswordTooShort { min: min_length });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::PasswordHasher;
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;

    /// Helper: hash a password with optional pepper using Argon2id.
    fn hash_password(password: &str, pepper: Option<&str>) -> String {
        let peppered: String;
        let input = match pepper {
            Some(p) => {
                peppered = format!("{p}{password}");
                peppered.as_bytes()
            }
            None => password.as_bytes(),
        };
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        argon2
            .hash_password(input, &salt)
            .expect("hashing failed")
            .to_string()
    }

    #[test]
    fn correct_password_matches() {
        let hash = hash_password("hunter2", None);
        assert!(verify_password("hunter2", &hash, None).unwrap());
    }

    #[test]
    fn wrong_password_does_not_match() {
        let hash = hash_password("hunter2", None);
        assert!(!verify_password("wrong", &hash, None).unwrap());
    }

    #[test]
    fn pepper_is_applied() {
        let hash = hash_password("hunter2", Some("pepper!"));
        assert!(verify_password("hunter2", &hash, Some("pepper!")).unwrap());
        assert!(!verify_password("hunter2", &hash, None).unwrap());
    }

    #[test]
    fn malformed_hash_returns_error() {
        assert!(verify_password("pw", "not-a-hash", None).is_err());
    }

    #[test]
    fn decoy_hash_is_well_formed_and_matches_nothing() {
        assert!(!verify_password("anything", DECOY_HASH, None).unwrap());
    }

    #[test]
    fn generated_passwords_are_url_safe_and_long_enough() {
        let password = generate_password(18);
        assert_eq!(password.len(), 24);
        assert!(
            password
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        // Tiny requests are raised to the 12-character floor.
        assert!(generate_password(1).len() >= 12);
        assert_ne!(generate_password(18), generate_password(18));
    }

    #[test]
    fn policy_counts_characters() {
        assert!(check_policy("short", 12).is_err());
        assert!(check_policy("long-enough-pw", 12).is_ok());
        assert!(matches!(
            check_policy("abc", 6),
            Err(MedsyncError::PasswordTooShort { min: 6 })
        ));
    }
}
