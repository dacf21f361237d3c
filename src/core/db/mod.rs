//! Database module for chirpy
//!
//! Storage traits for refresh tokens and user accounts, with Postgres and
//! in-memory implementations.

pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;
pub mod store;

pub use memory::{MemoryRefreshTokenStore, MemoryUserStore};
pub use models::{
    RefreshTokenRecord, RefreshTokenStatus, UserCredentials, UserId, UserResponse,
};
pub use pool::{DbConfig, DbError, create_pool, create_pool_with_migrations, health_check};
pub use repositories::{RefreshTokenRepository, UserRepository};
pub use store::{
    RefreshTokenRepositoryError, RefreshTokenStore, UserRepositoryError, UserStore, hash_token,
};

pub use sqlx::PgPool;
