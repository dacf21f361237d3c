//! Auth API endpoints
//!
//! Provides REST API endpoints for sessions:
//! - POST /api/users - Register a new user
//! - POST /api/login - Login and get tokens
//! - POST /api/refresh - Mint an access token from a refresh token
//! - POST /api/revoke - Revoke a refresh token
//! - GET /api/healthz - Health check, includes the database when one is configured
//! - GET /admin/metrics - Request count
//! - POST /admin/reset - Zero the request count (dev only)
//!
//! Resource handlers authenticate callers with the [`AuthUser`] and
//! [`WebhookCaller`] extractors and check ownership with
//! [`AuthService::ensure_owner`]:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use axum::{
//!     Router,
//!     extract::{Path, State},
//!     http::StatusCode,
//!     routing::{delete, post},
//! };
//! use chirpy::core::auth::{AppState, AuthError, AuthUser, WebhookCaller};
//! use uuid::Uuid;
//!
//! # fn chirp_author(_chirp_id: Uuid) -> Uuid { Uuid::nil() }
//! async fn delete_chirp(
//!     State(state): State<Arc<AppState>>,
//!     AuthUser(caller): AuthUser,
//!     Path(chirp_id): Path<Uuid>,
//! ) -> Result<StatusCode, AuthError> {
//!     state
//!         .auth_service
//!         .ensure_owner(caller, chirp_author(chirp_id))?;
//!     Ok(StatusCode::NO_CONTENT)
//! }
//!
//! async fn payment_webhook(_caller: WebhookCaller) -> StatusCode {
//!     StatusCode::NO_CONTENT
//! }
//!
//! let routes: Router<Arc<AppState>> = Router::new()
//!     .route("/api/chirps/{chirp_id}", delete(delete_chirp))
//!     .route("/api/polka/webhooks", post(payment_webhook));
//! ```

use axum::{
    Json, Router,
    extract::{FromRequestParts, State, rejection::JsonRejection},
    http::{StatusCode, request::Parts},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;

use crate::core::auth::{AuthError, AuthService, LoginRequest, RegisterRequest};
use crate::core::config::Platform;
use crate::core::db::models::{UserId, UserResponse};
use crate::core::db::{PgPool, health_check};
use crate::core::metrics::{RequestCounter, count_requests};

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub requests: Arc<RequestCounter>,
    pub platform: Platform,
    /// Pool checked by the health endpoint; `None` with in-memory stores
    pub db: Option<PgPool>,
}

impl AppState {
    pub fn new(auth_service: AuthService, platform: Platform) -> Self {
        Self {
            auth_service,
            requests: Arc::new(RequestCounter::new()),
            platform,
            db: None,
        }
    }

    /// Report database reachability on `/api/healthz`
    pub fn with_database(mut self, pool: PgPool) -> Self {
        self.db = Some(pool);
        self
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// Convert AuthError to API response.
///
/// The body is fixed per status; causes only go to the log.
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error, code) = match &self {
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized", "UNAUTHORIZED"),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden", "FORBIDDEN"),
            AuthError::InvalidInput(cause) => {
                tracing::debug!("Rejected request: {}", cause);
                (StatusCode::BAD_REQUEST, "Invalid input", "INVALID_INPUT")
            }
            AuthError::InternalError(cause) => {
                tracing::error!("Internal error: {}", cause);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    "INTERNAL_ERROR",
                )
            }
        };

        (status, Json(ApiError::new(error, code))).into_response()
    }
}

/// Response for a successful login
#[derive(Debug, Serialize)]
pub struct LoginApiResponse {
    pub id: UserId,
    pub email: String,
    pub token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub refresh_expires_at: i64,
}

/// Response for token refresh
#[derive(Debug, Serialize)]
pub struct RefreshApiResponse {
    pub token: String,
    pub expires_at: i64,
}

/// Identity of a caller holding a valid access token
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        state.auth_service.authorize(&parts.headers).map(AuthUser)
    }
}

/// Marker for a request that presented the webhook API key
#[derive(Debug, Clone, Copy)]
pub struct WebhookCaller;

impl FromRequestParts<Arc<AppState>> for WebhookCaller {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        state
            .auth_service
            .authorize_webhook(&parts.headers)
            .map(|()| WebhookCaller)
    }
}

/// Create the API router
pub fn api_router(state: AppState) -> Router {
    let requests = state.requests.clone();
    let state = Arc::new(state);

    let api = Router::new()
        .route("/api/healthz", get(healthz_handler))
        .route("/api/users", post(register_handler))
        .route("/api/login", post(login_handler))
        .route("/api/refresh", post(refresh_handler))
        .route("/api/revoke", post(revoke_handler))
        .route_layer(middleware::from_fn_with_state(requests, count_requests));

    let admin = Router::new()
        .route("/admin/metrics", get(metrics_handler))
        .route("/admin/reset", post(reset_handler));

    api.merge(admin).with_state(state)
}

/// GET /api/healthz
async fn healthz_handler(
    State(state): State<Arc<AppState>>,
) -> Result<&'static str, StatusCode> {
    if let Some(pool) = &state.db {
        health_check(pool).await.map_err(|e| {
            tracing::error!("Database health check failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        })?;
    }
    Ok("OK")
}

/// POST /api/users
/// Register a new user
async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AuthError> {
    let Json(request) = payload.map_err(|e| AuthError::InvalidInput(e.body_text()))?;

    let user = state.auth_service.register(request).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/login
/// Login and get access/refresh tokens
async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginApiResponse>, AuthError> {
    let Json(request) = payload.map_err(|e| AuthError::InvalidInput(e.body_text()))?;

    let response = state.auth_service.login(request).await?;

    Ok(Json(LoginApiResponse {
        id: response.user_id,
        email: response.email,
        token: response.tokens.access_token,
        refresh_token: response.tokens.refresh_token,
        expires_at: response.tokens.access_expires_at,
        refresh_expires_at: response.tokens.refresh_expires_at,
    }))
}

/// POST /api/refresh
/// Mint a new access token from the bearer refresh token
async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<RefreshApiResponse>, AuthError> {
    let access = state.auth_service.refresh(&headers).await?;

    Ok(Json(RefreshApiResponse {
        token: access.token,
        expires_at: access.expires_at,
    }))
}

/// POST /api/revoke
/// Revoke the bearer refresh token
async fn revoke_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<StatusCode, AuthError> {
    state.auth_service.revoke(&headers).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /admin/metrics
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        "<html><body><h1>Welcome, Chirpy Admin</h1><p>Chirpy has served {} API requests!</p></body></html>",
        state.requests.get()
    ))
}

/// POST /admin/reset
/// Zero the request counter, only on the dev platform
async fn reset_handler(State(state): State<Arc<AppState>>) -> Result<&'static str, AuthError> {
    if state.platform != Platform::Dev {
        return Err(AuthError::Forbidden);
    }

    state.requests.reset();
    tracing::info!("Request counter reset");

    Ok("Request counter reset.\n")
}
