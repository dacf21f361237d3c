//! Postgres repositories
//!
//! Implementations of the storage traits on top of `sqlx::PgPool`.

pub mod refresh_token;
pub mod user;

pub use refresh_token::RefreshTokenRepository;
pub use user::UserRepository;
