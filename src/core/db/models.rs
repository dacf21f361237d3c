//! Database models for chirpy
//!
//! Entity structs mapping the `users` and `refresh_tokens` tables.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Stable identifier of a user
pub type UserId = Uuid;

// ============================================================================
// User Model
// ============================================================================

/// The slice of a user account the login flow needs
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: UserId,
    pub email: String,
    pub hashed_password: String,
}

/// User data exposed by the API (no password hash)
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
}

impl From<UserCredentials> for UserResponse {
    fn from(user: UserCredentials) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

// ============================================================================
// Refresh Token Model
// ============================================================================

/// Refresh token record.
///
/// Only the SHA-256 digest of the token is kept. `revoked_at` goes from
/// `None` to `Some` at most once; records are never deleted.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRecord {
    pub token_hash: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of a refresh token at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshTokenStatus {
    Active,
    Expired,
    Revoked,
}

impl RefreshTokenRecord {
    /// Classify the record at `now`. Revocation takes precedence over expiry.
    pub fn status(&self, now: DateTime<Utc>) -> RefreshTokenStatus {
        if self.revoked_at.is_some() {
            RefreshTokenStatus::Revoked
        } else if now >= self.expires_at {
            RefreshTokenStatus::Expired
        } else {
            RefreshTokenStatus::Active
        }
    }

    /// Whether the token may still mint access tokens at `now`
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == RefreshTokenStatus::Active
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expires_in: Duration, revoked: bool) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord {
            token_hash: "hash".to_string(),
            user_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            expires_at: now + expires_in,
            revoked_at: revoked.then_some(now),
        }
    }

    #[test]
    fn test_fresh_record_is_active() {
        let rec = record(Duration::days(60), false);

        assert_eq!(rec.status(Utc::now()), RefreshTokenStatus::Active);
        assert!(rec.is_usable(Utc::now()));
    }

    #[test]
    fn test_past_expiry_is_expired() {
        let rec = record(Duration::seconds(-1), false);

        assert_eq!(rec.status(Utc::now()), RefreshTokenStatus::Expired);
        assert!(!rec.is_usable(Utc::now()));
    }

    #[test]
    fn test_expiry_instant_itself_is_expired() {
        let rec = record(Duration::days(1), false);

        assert_eq!(rec.status(rec.expires_at), RefreshTokenStatus::Expired);
        assert_eq!(
            rec.status(rec.expires_at - Duration::milliseconds(1)),
            RefreshTokenStatus::Active
        );
    }

    #[test]
    fn test_revoked_unexpired_is_revoked() {
        let rec = record(Duration::days(60), true);

        assert_eq!(rec.status(Utc::now()), RefreshTokenStatus::Revoked);
        assert!(!rec.is_usable(Utc::now()));
    }

    #[test]
    fn test_revocation_wins_over_expiry() {
        let rec = record(Duration::seconds(-10), true);

        assert_eq!(rec.status(Utc::now()), RefreshTokenStatus::Revoked);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&RefreshTokenStatus::Revoked).unwrap();

        assert_eq!(json, r#""revoked""#);
    }
}
