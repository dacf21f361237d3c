//! Password hashing
//!
//! One-way bcrypt hashing for user passwords. Digests are self-salted, so
//! hashing the same secret twice yields two different strings; the only
//! supported operation on a stored digest is verification.

use std::sync::OnceLock;

/// Cost factor for bcrypt hashing
pub const BCRYPT_COST: u32 = 10;

/// Password hashing error types
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password does not match")]
    Mismatch,

    #[error("Password hashing failed: {0}")]
    HashingFailure(String),
}

/// Hash a password using bcrypt with automatic salt generation
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| PasswordError::HashingFailure(e.to_string()))
}

/// Verify a password against a bcrypt digest.
///
/// A wrong password is `Mismatch`. `HashingFailure` is reserved for digests
/// that cannot be parsed or for a failing entropy source, and its message
/// never contains the password or the digest.
pub fn verify_password(hash: &str, password: &str) -> Result<(), PasswordError> {
    match bcrypt::verify(password, hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(PasswordError::Mismatch),
        // bcrypt echoes the offending digest in some messages, keep it out
        Err(_) => Err(PasswordError::HashingFailure(
            "stored digest could not be parsed".to_string(),
        )),
    }
}

/// Throwaway digest used when there is no account to verify against
fn decoy_hash() -> Option<&'static str> {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();
    DECOY
        .get_or_init(|| bcrypt::hash("chirpy-decoy-password", BCRYPT_COST).ok())
        .as_deref()
}

/// Spend the same time as a real verification without a real digest.
///
/// Login calls this for unknown emails so response timing does not reveal
/// which half of the credentials was wrong.
pub fn burn_verification_time(password: &str) {
    if let Some(hash) = decoy_hash() {
        let _ = bcrypt::verify(password, hash);
    }
}
