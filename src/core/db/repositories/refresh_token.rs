//! Refresh token repository
//!
//! Postgres-backed `RefreshTokenStore`. Tokens are stored as SHA-256 hashes
//! and every operation is a single-row statement.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;

use crate::core::db::models::{RefreshTokenRecord, UserId};
use crate::core::db::store::{
    DEFAULT_REFRESH_TOKEN_TTL_DAYS, RefreshTokenRepositoryError, RefreshTokenStore, hash_token,
};

/// Refresh token repository for database operations
#[derive(Clone)]
pub struct RefreshTokenRepository {
    pool: PgPool,
    ttl: Duration,
}

impl RefreshTokenRepository {
    /// Create a new refresh token repository
    pub fn new(pool: PgPool) -> Self {
        Self::with_ttl(pool, Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS))
    }

    /// Create a repository whose tokens expire `ttl` after creation
    pub fn with_ttl(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }
}

#[async_trait]
impl RefreshTokenStore for RefreshTokenRepository {
    async fn put(
        &self,
        token: &str,
        user_id: UserId,
    ) -> Result<RefreshTokenRecord, RefreshTokenRepositoryError> {
        let token_hash = hash_token(token);
        let expires_at = Utc::now() + self.ttl;

        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (token_hash) DO NOTHING
            RETURNING token_hash, user_id, created_at, updated_at, expires_at, revoked_at
            "#,
        )
        .bind(&token_hash)
        .bind(user_id)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or(RefreshTokenRepositoryError::AlreadyExists)
    }

    async fn get_by_token(
        &self,
        token: &str,
    ) -> Result<RefreshTokenRecord, RefreshTokenRepositoryError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT token_hash, user_id, created_at, updated_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or(RefreshTokenRepositoryError::NotFound)
    }

    async fn revoke(&self, token: &str) -> Result<RefreshTokenRecord, RefreshTokenRepositoryError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = COALESCE(revoked_at, NOW()),
                updated_at = CASE WHEN revoked_at IS NULL THEN NOW() ELSE updated_at END
            WHERE token_hash = $1
            RETURNING token_hash, user_id, created_at, updated_at, expires_at, revoked_at
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or(RefreshTokenRepositoryError::NotFound)
    }
}
