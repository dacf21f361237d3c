//! Refresh token generation
//!
//! Refresh tokens are opaque: 32 bytes from the operating system's CSPRNG,
//! hex-encoded. They carry no claims; everything about a refresh token
//! (owner, expiry, revocation) lives in the credential store.

use rand::RngCore;
use rand::rngs::OsRng;

/// Number of random bytes in a refresh token
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Length of an encoded refresh token
pub const REFRESH_TOKEN_LEN: usize = REFRESH_TOKEN_BYTES * 2;

/// Refresh token generation errors
#[derive(Debug, thiserror::Error)]
pub enum RefreshTokenError {
    #[error("Entropy source failed: {0}")]
    EntropyFailure(String),
}

/// Generate a refresh token from the OS random source
pub fn generate_refresh_token() -> Result<String, RefreshTokenError> {
    generate_refresh_token_with(&mut OsRng)
}

/// Generate a refresh token from `rng`.
///
/// The buffer is filled in one fallible call. If the source cannot supply
/// all 32 bytes the whole operation fails; a shorter token is never returned.
pub fn generate_refresh_token_with<R: RngCore + ?Sized>(
    rng: &mut R,
) -> Result<String, RefreshTokenError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rng.try_fill_bytes(&mut bytes)
        .map_err(|e| RefreshTokenError::EntropyFailure(e.to_string()))?;

    Ok(hex::encode(bytes))
}
