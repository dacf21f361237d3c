//! Authentication service
//!
//! Composes the password hasher, the access token codec, the refresh token
//! generator and the stores into the session flows: registration, login,
//! request authorization, refresh, revoke and the webhook key check.
//!
//! Each session lineage moves through
//! `Unauthenticated -> Authenticated(access, refresh) -> Refreshed(access')`
//! and ends in `Revoked`. Access tokens are never tracked server-side, so
//! revoking a refresh token does not cut short access tokens already issued
//! from it; they run until their own expiry. Refresh tokens are not rotated
//! on use.

use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::core::auth::header::{HeaderError, extract_api_key, extract_bearer_token};
use crate::core::auth::jwt::{ACCESS_TOKEN_TTL_SECS, AccessToken, JwtError, JwtService};
use crate::core::auth::password::{self, PasswordError};
use crate::core::auth::refresh::{RefreshTokenError, generate_refresh_token};
use crate::core::db::models::{UserId, UserResponse};
use crate::core::db::store::{
    RefreshTokenRepositoryError, RefreshTokenStore, UserRepositoryError, UserStore,
};

/// Authentication service error types
///
/// Every credential problem collapses into `Unauthorized`. The granular cause
/// is logged where it is known and never reaches the client.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<HeaderError> for AuthError {
    fn from(err: HeaderError) -> Self {
        tracing::debug!("Rejected authorization header: {}", err);
        AuthError::Unauthorized
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidExpiry | JwtError::EncodingError(_) => {
                AuthError::InternalError(err.to_string())
            }
            _ => {
                tracing::debug!("Rejected access token: {}", err);
                AuthError::Unauthorized
            }
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Mismatch => AuthError::Unauthorized,
            PasswordError::HashingFailure(_) => AuthError::InternalError(err.to_string()),
        }
    }
}

impl From<RefreshTokenError> for AuthError {
    fn from(err: RefreshTokenError) -> Self {
        AuthError::InternalError(err.to_string())
    }
}

impl From<RefreshTokenRepositoryError> for AuthError {
    fn from(err: RefreshTokenRepositoryError) -> Self {
        match err {
            RefreshTokenRepositoryError::NotFound => AuthError::Unauthorized,
            _ => AuthError::InternalError(err.to_string()),
        }
    }
}

impl From<UserRepositoryError> for AuthError {
    fn from(err: UserRepositoryError) -> Self {
        match err {
            UserRepositoryError::EmailAlreadyExists => AuthError::InvalidInput(err.to_string()),
            UserRepositoryError::DatabaseError(_) => AuthError::InternalError(err.to_string()),
        }
    }
}

/// Registration request data
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Login request data
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Access and refresh token issued at login
#[derive(Debug, Clone, serde::Serialize)]
pub struct TokenPair {
    /// Access token (short-lived)
    pub access_token: String,
    /// Refresh token (long-lived, opaque)
    pub refresh_token: String,
    /// Access token expiration (Unix timestamp)
    pub access_expires_at: i64,
    /// Refresh token expiration (Unix timestamp)
    pub refresh_expires_at: i64,
}

/// Authentication response with the user and their tokens
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuthResponse {
    pub user_id: UserId,
    pub email: String,
    pub tokens: TokenPair,
}

/// Token lifetimes used by the session flows
#[derive(Debug, Clone, Copy)]
pub struct SessionTtl {
    pub access: Duration,
}

impl Default for SessionTtl {
    fn default() -> Self {
        Self {
            access: Duration::seconds(ACCESS_TOKEN_TTL_SECS),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    jwt_service: JwtService,
    webhook_key_digest: Option<[u8; 32]>,
    ttl: SessionTtl,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        jwt_service: JwtService,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            jwt_service,
            webhook_key_digest: None,
            ttl: SessionTtl::default(),
        }
    }

    /// Accept webhook calls carrying this API key
    pub fn with_webhook_key(mut self, key: &SecretString) -> Self {
        self.webhook_key_digest = Some(digest(key.expose_secret()));
        self
    }

    /// Override the access token lifetime
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.ttl.access = ttl;
        self
    }

    fn validate_email(email: &str) -> Result<(), AuthError> {
        match email.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(())
            }
            _ => Err(AuthError::InvalidInput("email address is malformed".into())),
        }
    }

    fn validate_password(password: &str) -> Result<(), AuthError> {
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password is empty".into()));
        }
        Ok(())
    }

    /// Register a new user
    pub async fn register(&self, request: RegisterRequest) -> Result<UserResponse, AuthError> {
        Self::validate_email(&request.email)?;
        Self::validate_password(&request.password)?;

        let hashed_password = password::hash_password(&request.password)?;
        let user = self.users.create(&request.email, &hashed_password).await?;

        tracing::info!(user_id = %user.id, "User registered");

        Ok(user.into())
    }

    /// Login an existing user
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let Some(user) = self.users.find_by_email(&request.email).await? else {
            password::burn_verification_time(&request.password);
            tracing::debug!("Login rejected: unknown account");
            return Err(AuthError::Unauthorized);
        };

        if let Err(err) = password::verify_password(&user.hashed_password, &request.password) {
            tracing::debug!(user_id = %user.id, "Login rejected: {}", err);
            return Err(err.into());
        }

        let access = self.jwt_service.issue(user.id, self.ttl.access)?;
        let refresh_token = generate_refresh_token()?;
        let record = self.refresh_tokens.put(&refresh_token, user.id).await?;

        tracing::info!(user_id = %user.id, jti = %access.jti, "User logged in");

        Ok(AuthResponse {
            user_id: user.id,
            email: user.email,
            tokens: TokenPair {
                access_token: access.token,
                refresh_token,
                access_expires_at: access.expires_at,
                refresh_expires_at: record.expires_at.timestamp(),
            },
        })
    }

    /// Validate the bearer access token on a request and return its user ID
    pub fn authorize(&self, headers: &HeaderMap) -> Result<UserId, AuthError> {
        let token = extract_bearer_token(headers)?;
        self.validate_access_token(&token)
    }

    /// Validate an access token and return the user ID if valid
    pub fn validate_access_token(&self, token: &str) -> Result<UserId, AuthError> {
        Ok(self.jwt_service.verify(token)?)
    }

    /// Mint a new access token from the bearer refresh token on a request
    pub async fn refresh(&self, headers: &HeaderMap) -> Result<AccessToken, AuthError> {
        let token = extract_bearer_token(headers)?;
        self.refresh_token(&token).await
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The refresh token itself is left untouched and stays usable until it
    /// expires or is revoked.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<AccessToken, AuthError> {
        let record = match self.refresh_tokens.get_by_token(refresh_token).await {
            Ok(record) => record,
            Err(RefreshTokenRepositoryError::NotFound) => {
                tracing::debug!("Refresh rejected: unknown token");
                return Err(AuthError::Unauthorized);
            }
            Err(err) => return Err(err.into()),
        };

        let now = Utc::now();
        if !record.is_usable(now) {
            let status = record.status(now);
            tracing::debug!(user_id = %record.user_id, ?status, "Refresh rejected");
            return Err(AuthError::Unauthorized);
        }

        let access = self.jwt_service.issue(record.user_id, self.ttl.access)?;
        tracing::debug!(user_id = %record.user_id, jti = %access.jti, "Access token refreshed");

        Ok(access)
    }

    /// Revoke the bearer refresh token on a request
    pub async fn revoke(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let token = extract_bearer_token(headers)?;
        self.revoke_token(&token).await
    }

    /// Revoke a refresh token.
    ///
    /// Succeeds for tokens that are already revoked (their timestamp is kept)
    /// and for tokens that were never issued, so the response says nothing
    /// about whether a token exists.
    pub async fn revoke_token(&self, refresh_token: &str) -> Result<(), AuthError> {
        match self.refresh_tokens.revoke(refresh_token).await {
            Ok(record) => {
                tracing::info!(user_id = %record.user_id, "Refresh token revoked");
                Ok(())
            }
            Err(RefreshTokenRepositoryError::NotFound) => {
                tracing::debug!("Revoke requested for unknown refresh token");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Check that `caller` owns the resource owned by `owner`
    pub fn ensure_owner(&self, caller: UserId, owner: UserId) -> Result<(), AuthError> {
        if caller == owner {
            Ok(())
        } else {
            tracing::debug!(%caller, %owner, "Ownership check failed");
            Err(AuthError::Forbidden)
        }
    }

    /// Validate the `ApiKey` credential presented by the webhook caller
    pub fn authorize_webhook(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let Some(expected) = self.webhook_key_digest.as_ref() else {
            tracing::warn!("Webhook call rejected: no webhook key configured");
            return Err(AuthError::Unauthorized);
        };

        let presented = extract_api_key(headers)?;

        if constant_time_eq(&digest(&presented), expected) {
            Ok(())
        } else {
            tracing::debug!("Webhook call rejected: key mismatch");
            Err(AuthError::Unauthorized)
        }
    }
}

/// Hash keys to a fixed length so the comparison does not leak their length
fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
