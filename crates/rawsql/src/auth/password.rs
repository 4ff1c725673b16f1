//! Password verifiers.
//!
//! Verifiers are argon2id PHC strings with a random salt per password.
//! Comparison happens inside `argon2`, which checks the derived output in
//! constant time.

use std::sync::OnceLock;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, Salt, SaltString},
    Argon2,
};

use crate::error::AuthError;

/// Hashes a password into a PHC-formatted argon2 verifier.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = generate_salt()?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Verifier(e.to_string()))?;
    Ok(hash.to_string())
}

/// Random salt from the OS RNG.
fn generate_salt() -> Result<SaltString, AuthError> {
    let mut bytes = [0u8; Salt::RECOMMENDED_LENGTH];
    getrandom::fill(&mut bytes).map_err(|e| AuthError::Verifier(e.to_string()))?;
    SaltString::encode_b64(&bytes).map_err(|e| AuthError::Verifier(e.to_string()))
}

/// Verifies a password against a stored verifier.
///
/// A malformed verifier never matches.
pub fn verify_password(password: &str, verifier: &str) -> bool {
    let parsed = match PasswordHash::new(verifier) {
        Ok(h) => h,
        Err(e) => {
            log::warn!("Stored password verifier is malformed: {}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Returns true if the string parses as a PHC verifier.
pub fn is_valid_verifier(verifier: &str) -> bool {
    PasswordHash::new(verifier).is_ok()
}

/// Runs a verification against a throwaway verifier so that a lookup miss
/// costs about as much as a wrong password.
pub(crate) fn burn_verification(password: &str) {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    if let Some(verifier) = DUMMY.get_or_init(|| hash_password("rawsql-unknown-user").ok()) {
        let _ = verify_password(password, verifier);
    }
}
