//! Credential hashing and verification

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use tracing::warn;

use crate::error::{AuthError, AuthResult};

/// Hash a plaintext password into a PHC string
pub fn hash_credential(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Validation(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored credential.
///
/// PHC strings are verified with Argon2. Anything else is a legacy plaintext
/// row and is compared for equality.
pub fn verify_credential(password: &str, stored: &str) -> bool {
    if !stored.starts_with('$') {
        return password == stored;
    }

    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored credential looks like a hash but does not parse: {}", e);
            false
        }
    }
}
