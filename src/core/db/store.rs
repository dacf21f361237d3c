//! Storage interfaces used by the session flows
//!
//! The auth service talks to storage only through these traits, so the same
//! flows run against Postgres in production and against in-memory maps in
//! tests and local development.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::core::db::models::{RefreshTokenRecord, UserCredentials, UserId};

/// Default refresh token lifetime (60 days)
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 60;

/// Refresh token store error types
#[derive(Debug, thiserror::Error)]
pub enum RefreshTokenRepositoryError {
    #[error("Refresh token not found")]
    NotFound,

    #[error("Refresh token already exists")]
    AlreadyExists,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// User store error types
#[derive(Debug, thiserror::Error)]
pub enum UserRepositoryError {
    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Hash a refresh token using SHA-256.
///
/// Stores key records by this digest so the raw token never reaches storage.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Persistence for refresh tokens.
///
/// Every method touches a single record. Lookups return the record whatever
/// its state; deciding whether it is still usable is the caller's job.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Store `token` for `user_id`, expiring after the store's TTL
    async fn put(
        &self,
        token: &str,
        user_id: UserId,
    ) -> Result<RefreshTokenRecord, RefreshTokenRepositoryError>;

    /// Look up the record for `token`, expired and revoked ones included
    async fn get_by_token(
        &self,
        token: &str,
    ) -> Result<RefreshTokenRecord, RefreshTokenRepositoryError>;

    /// Set `revoked_at` if it is not set yet and return the record.
    ///
    /// Revoking twice leaves the first timestamp in place.
    async fn revoke(&self, token: &str) -> Result<RefreshTokenRecord, RefreshTokenRepositoryError>;
}

/// User accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create an account from an already hashed password.
    ///
    /// Fails with `EmailAlreadyExists` when the email is taken, including
    /// when two registrations for it race.
    async fn create(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<UserCredentials, UserRepositoryError>;

    /// Find the credentials of the account registered under `email`
    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, UserRepositoryError>;
}
