//! Authorization header parsing
//!
//! Both credential kinds travel in the `Authorization` header as
//! `<Scheme> <credential>`: `Bearer` for access and refresh tokens, `ApiKey`
//! for the webhook key.

use axum::http::{HeaderMap, header};

/// Scheme label for access and refresh tokens
pub const BEARER_SCHEME: &str = "Bearer";

/// Scheme label for API keys
pub const API_KEY_SCHEME: &str = "ApiKey";

/// Authorization header errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("Authorization header missing")]
    MissingHeader,

    #[error("Authorization header malformed")]
    MalformedHeader,
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, HeaderError> {
    parse_authorization(headers, BEARER_SCHEME)
}

/// Extract the key from `Authorization: ApiKey <key>`
pub fn extract_api_key(headers: &HeaderMap) -> Result<String, HeaderError> {
    parse_authorization(headers, API_KEY_SCHEME)
}

fn parse_authorization(headers: &HeaderMap, scheme: &str) -> Result<String, HeaderError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(HeaderError::MissingHeader)?
        .to_str()
        .map_err(|_| HeaderError::MalformedHeader)?;

    if value.is_empty() {
        return Err(HeaderError::MissingHeader);
    }

    let (label, credential) = value
        .split_once(' ')
        .ok_or(HeaderError::MalformedHeader)?;

    // Exactly two segments: a second space means a third segment
    if label != scheme || credential.is_empty() || credential.contains(' ') {
        return Err(HeaderError::MalformedHeader);
    }

    Ok(credential.to_string())
}
