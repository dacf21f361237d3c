//! Authentication module for chirpy
//!
//! This module provides session functionality including:
//! - bcrypt password hashing and verification
//! - JWT access token issuing and validation
//! - Opaque refresh tokens, persisted and revocable
//! - `Authorization` header parsing for `Bearer` and `ApiKey` credentials
//! - REST API endpoints and extractors for auth operations

pub mod api;
pub mod header;
pub mod jwt;
pub mod password;
pub mod refresh;
pub mod service;

pub use api::{AppState, AuthUser, WebhookCaller, api_router};
pub use header::{HeaderError, extract_api_key, extract_bearer_token};
pub use jwt::{AccessToken, Claims, JwtError, JwtService};
pub use password::{PasswordError, hash_password, verify_password};
pub use refresh::{RefreshTokenError, generate_refresh_token};
pub use service::{
    AuthError, AuthResponse, AuthService, LoginRequest, RegisterRequest, TokenPair,
};
