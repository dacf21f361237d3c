//! User repository for database operations
//!
//! Account creation and lookup by email on the `users` table.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::db::models::UserCredentials;
use crate::core::db::store::{UserRepositoryError, UserStore};

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Postgres SQLSTATE for a unique constraint violation
const UNIQUE_VIOLATION: &str = "23505";

// The UNIQUE constraint on email decides races between concurrent inserts
fn map_insert_error(err: sqlx::Error) -> UserRepositoryError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
    {
        return UserRepositoryError::EmailAlreadyExists;
    }
    UserRepositoryError::DatabaseError(err)
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<UserCredentials, UserRepositoryError> {
        sqlx::query_as::<_, UserCredentials>(
            r#"
            INSERT INTO users (email, hashed_password)
            VALUES ($1, $2)
            RETURNING id, email, hashed_password
            "#,
        )
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)
    }

    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, UserRepositoryError> {
        let user = sqlx::query_as::<_, UserCredentials>(
            r#"
            SELECT id, email, hashed_password
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
