//! JWT utilities for access token generation and validation
//!
//! Access tokens are HS256-signed JWTs binding a user ID to an issue time,
//! an expiry time, the service issuer label and a unique token ID. They are
//! stateless: nothing about an issued token is stored server-side, so a token
//! is valid exactly when its signature checks out under the current secret and
//! its expiry has not been reached.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::db::models::UserId;

/// Issuer label embedded in every access token
pub const ACCESS_TOKEN_ISSUER: &str = "chirpy";

/// Default access token lifetime (1 hour)
pub const ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;

/// JWT errors
///
/// The variants are for server-side logs. Callers outside the auth module only
/// ever see a generic "unauthorized" outcome.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token lifetime must be positive")]
    InvalidExpiry,

    #[error("Token encoding failed: {0}")]
    EncodingError(String),

    #[error("Token expired")]
    Expired,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token subject is not a valid user ID")]
    MalformedIdentity,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            _ => JwtError::Malformed(err.to_string()),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// JWT ID, only used to correlate log lines
    pub jti: String,
}

impl Claims {
    /// Get user ID as UUID
    pub fn user_id(&self) -> Result<UserId, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::MalformedIdentity)
    }
}

/// A freshly signed access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    /// Compact JWT
    pub token: String,
    /// Expiration (Unix timestamp)
    pub expires_at: i64,
    /// JWT ID
    pub jti: Uuid,
}

/// JWT service for access token operations
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
}

impl JwtService {
    /// Create a JWT service keyed by the signing secret
    pub fn new(secret: &str) -> Self {
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ACCESS_TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);
        validation.leeway = 0;

        Self {
            encoding_key,
            decoding_key,
            validation,
            issuer: ACCESS_TOKEN_ISSUER.to_string(),
        }
    }

    /// Issue an access token for `user_id` that lives for `ttl`
    pub fn issue(&self, user_id: UserId, ttl: Duration) -> Result<AccessToken, JwtError> {
        if ttl <= Duration::zero() {
            return Err(JwtError::InvalidExpiry);
        }

        let now = Utc::now();
        let exp = now + ttl;
        let jti = Uuid::new_v4();

        let claims = Claims {
            iss: self.issuer.clone(),
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: jti.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;

        Ok(AccessToken {
            token,
            expires_at: claims.exp,
            jti,
        })
    }

    /// Validate and decode a token, returning its claims
    pub fn decode_claims(&self, token: &str) -> Result<Claims, JwtError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        let claims = token_data.claims;

        // jsonwebtoken still accepts a token during its expiry second
        if Utc::now().timestamp() >= claims.exp {
            return Err(JwtError::Expired);
        }

        Ok(claims)
    }

    /// Verify an access token and recover the user ID it was issued for
    pub fn verify(&self, token: &str) -> Result<UserId, JwtError> {
        let claims = self.decode_claims(token)?;
        let user_id = claims.user_id()?;

        tracing::trace!(%user_id, jti = %claims.jti, "Access token verified");

        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> JwtService {
        JwtService::new("test_secret_key_for_testing_only_32bytes!")
    }

    fn sign_raw(service: &JwtService, claims: &Claims) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &service.encoding_key).unwrap()
    }

    // ========================================================================
    // Issue / Verify Tests
    // ========================================================================

    #[test]
    fn test_issue_and_verify_round_trip() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        let access = service.issue(user_id, Duration::minutes(15)).unwrap();

        assert!(!access.token.is_empty());
        assert!(access.expires_at > Utc::now().timestamp());
        assert_eq!(service.verify(&access.token).unwrap(), user_id);
    }

    #[test]
    fn test_issue_embeds_expected_claims() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        let access = service.issue(user_id, Duration::hours(1)).unwrap();
        let claims = service.decode_claims(&access.token).unwrap();

        assert_eq!(claims.iss, ACCESS_TOKEN_ISSUER);
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_TTL_SECS);
        assert_eq!(claims.exp, access.expires_at);
        assert_eq!(claims.jti, access.jti.to_string());
    }

    #[test]
    fn test_issue_rejects_zero_ttl() {
        let service = create_test_service();

        let result = service.issue(Uuid::new_v4(), Duration::zero());
        assert!(matches!(result, Err(JwtError::InvalidExpiry)));
    }

    #[test]
    fn test_issue_rejects_negative_ttl() {
        let service = create_test_service();

        let result = service.issue(Uuid::new_v4(), Duration::seconds(-30));
        assert!(matches!(result, Err(JwtError::InvalidExpiry)));
    }

    #[test]
    fn test_token_contains_unique_jti() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        let first = service.issue(user_id, Duration::minutes(5)).unwrap();
        let second = service.issue(user_id, Duration::minutes(5)).unwrap();

        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_verify_with_wrong_secret_fails() {
        let good = JwtService::new("good");
        let bad = JwtService::new("bad");

        let access = good.issue(Uuid::new_v4(), Duration::minutes(15)).unwrap();

        let result = bad.verify(&access.token);
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_verify_with_swapped_signature_fails() {
        let service = create_test_service();
        let other = JwtService::new("another_secret");
        let user_id = Uuid::new_v4();

        let ours = service.issue(user_id, Duration::minutes(15)).unwrap();
        let theirs = other.issue(user_id, Duration::minutes(15)).unwrap();

        let (our_body, _) = ours.token.rsplit_once('.').unwrap();
        let (_, their_sig) = theirs.token.rsplit_once('.').unwrap();
        let forged = format!("{our_body}.{their_sig}");

        assert!(matches!(
            service.verify(&forged),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expired_token() {
        let service = JwtService::new("secret");
        let access = service.issue(Uuid::new_v4(), Duration::seconds(1)).unwrap();

        std::thread::sleep(std::time::Duration::from_secs(2));

        let result = service.verify(&access.token);
        assert!(
            matches!(result, Err(JwtError::Expired)),
            "Expected Expired error, got: {:?}",
            result
        );
    }

    #[test]
    fn test_token_past_expiry_is_rejected() {
        let service = create_test_service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: ACCESS_TOKEN_ISSUER.to_string(),
            sub: Uuid::new_v4().to_string(),
            iat: now - 120,
            exp: now - 60,
            jti: Uuid::new_v4().to_string(),
        };

        let token = sign_raw(&service, &claims);
        assert!(matches!(service.verify(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_token_at_expiry_second_is_rejected() {
        let service = create_test_service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: ACCESS_TOKEN_ISSUER.to_string(),
            sub: Uuid::new_v4().to_string(),
            iat: now - 60,
            exp: now,
            jti: Uuid::new_v4().to_string(),
        };

        let token = sign_raw(&service, &claims);
        assert!(matches!(service.verify(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_verify_rejects_other_algorithm() {
        let service = create_test_service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: ACCESS_TOKEN_ISSUER.to_string(),
            sub: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + 600,
            jti: Uuid::new_v4().to_string(),
        };

        let token =
            encode(&Header::new(Algorithm::HS384), &claims, &service.encoding_key).unwrap();
        assert!(matches!(service.verify(&token), Err(JwtError::Malformed(_))));
    }

    #[test]
    fn test_verify_garbage_is_malformed() {
        let service = create_test_service();

        assert!(matches!(
            service.verify("invalid.token.here"),
            Err(JwtError::Malformed(_))
        ));
        assert!(matches!(service.verify(""), Err(JwtError::Malformed(_))));
    }

    #[test]
    fn test_verify_rejects_foreign_issuer() {
        let service = create_test_service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: "someone-else".to_string(),
            sub: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + 600,
            jti: Uuid::new_v4().to_string(),
        };

        let token = sign_raw(&service, &claims);
        assert!(matches!(service.verify(&token), Err(JwtError::Malformed(_))));
    }

    #[test]
    fn test_verify_non_uuid_subject_is_malformed_identity() {
        let service = create_test_service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: ACCESS_TOKEN_ISSUER.to_string(),
            sub: "not-a-uuid".to_string(),
            iat: now,
            exp: now + 600,
            jti: Uuid::new_v4().to_string(),
        };

        let token = sign_raw(&service, &claims);
        assert!(matches!(
            service.verify(&token),
            Err(JwtError::MalformedIdentity)
        ));
    }

    // ========================================================================
    // Error Tests
    // ========================================================================

    #[test]
    fn test_jwt_error_display() {
        assert_eq!(
            format!("{}", JwtError::InvalidExpiry),
            "Token lifetime must be positive"
        );
        assert_eq!(format!("{}", JwtError::Expired), "Token expired");
        assert_eq!(
            format!("{}", JwtError::InvalidSignature),
            "Token signature is invalid"
        );
        assert_eq!(
            format!("{}", JwtError::MalformedIdentity),
            "Token subject is not a valid user ID"
        );
    }

    #[test]
    fn test_access_token_serialization() {
        let access = AccessToken {
            token: "header.payload.sig".to_string(),
            expires_at: 1234567890,
            jti: Uuid::nil(),
        };

        let json = serde_json::to_string(&access).unwrap();
        assert!(json.contains("header.payload.sig"));
        assert!(json.contains("1234567890"));
    }
}
