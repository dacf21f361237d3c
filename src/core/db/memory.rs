//! In-memory stores
//!
//! `DashMap`-backed implementations of the storage traits. Used by the test
//! suite and by the server when no `DATABASE_URL` is configured.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::core::db::models::{RefreshTokenRecord, UserCredentials, UserId};
use crate::core::db::store::{
    DEFAULT_REFRESH_TOKEN_TTL_DAYS, RefreshTokenRepositoryError, RefreshTokenStore,
    UserRepositoryError, UserStore, hash_token,
};

/// Refresh tokens keyed by token hash
#[derive(Debug)]
pub struct MemoryRefreshTokenStore {
    tokens: DashMap<String, RefreshTokenRecord>,
    ttl: Duration,
}

impl MemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS))
    }

    /// Store whose tokens expire `ttl` after creation
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for MemoryRefreshTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn put(
        &self,
        token: &str,
        user_id: UserId,
    ) -> Result<RefreshTokenRecord, RefreshTokenRepositoryError> {
        let now = Utc::now();
        let record = RefreshTokenRecord {
            token_hash: hash_token(token),
            user_id,
            created_at: now,
            updated_at: now,
            expires_at: now + self.ttl,
            revoked_at: None,
        };

        match self.tokens.entry(record.token_hash.clone()) {
            Entry::Occupied(_) => Err(RefreshTokenRepositoryError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn get_by_token(
        &self,
        token: &str,
    ) -> Result<RefreshTokenRecord, RefreshTokenRepositoryError> {
        self.tokens
            .get(&hash_token(token))
            .map(|entry| entry.value().clone())
            .ok_or(RefreshTokenRepositoryError::NotFound)
    }

    async fn revoke(&self, token: &str) -> Result<RefreshTokenRecord, RefreshTokenRepositoryError> {
        let mut entry = self
            .tokens
            .get_mut(&hash_token(token))
            .ok_or(RefreshTokenRepositoryError::NotFound)?;

        if entry.revoked_at.is_none() {
            let now = Utc::now();
            entry.revoked_at = Some(now);
            entry.updated_at = now;
        }

        Ok(entry.value().clone())
    }
}

/// User accounts keyed by email
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<String, UserCredentials>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account with an already hashed password
    pub fn insert(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<UserCredentials, UserRepositoryError> {
        match self.users.entry(email.to_string()) {
            Entry::Occupied(_) => Err(UserRepositoryError::EmailAlreadyExists),
            Entry::Vacant(slot) => {
                let user = UserCredentials {
                    id: Uuid::new_v4(),
                    email: email.to_string(),
                    hashed_password: hashed_password.to_string(),
                };
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<UserCredentials, UserRepositoryError> {
        self.insert(email, hashed_password)
    }

    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, UserRepositoryError> {
        Ok(self.users.get(email).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::core::db::models::RefreshTokenStatus;

    #[tokio::test]
    async fn test_put_and_get_by_token() {
        let store = MemoryRefreshTokenStore::new();
        let user_id = Uuid::new_v4();

        let created = store.put("token-a", user_id).await.unwrap();
        let found = store.get_by_token("token-a").await.unwrap();

        assert_eq!(found.user_id, user_id);
        assert_eq!(found.token_hash, created.token_hash);
        assert_eq!(found.token_hash, hash_token("token-a"));
        assert!(found.revoked_at.is_none());
    }

    #[tokio::test]
    async fn test_put_uses_default_ttl() {
        let store = MemoryRefreshTokenStore::new();

        let record = store.put("token-ttl", Uuid::new_v4()).await.unwrap();

        assert_eq!(
            record.expires_at - record.created_at,
            Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS)
        );
    }

    #[tokio::test]
    async fn test_put_duplicate_token_is_rejected() {
        let store = MemoryRefreshTokenStore::new();

        store.put("dup", Uuid::new_v4()).await.unwrap();
        let result = store.put("dup", Uuid::new_v4()).await;

        assert!(matches!(
            result,
            Err(RefreshTokenRepositoryError::AlreadyExists)
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_token_is_not_found() {
        let store = MemoryRefreshTokenStore::new();

        let result = store.get_by_token("missing").await;
        assert!(matches!(result, Err(RefreshTokenRepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_get_returns_expired_records() {
        let store = MemoryRefreshTokenStore::with_ttl(Duration::seconds(-1));
        store.put("stale", Uuid::new_v4()).await.unwrap();

        let record = store.get_by_token("stale").await.unwrap();
        assert_eq!(record.status(Utc::now()), RefreshTokenStatus::Expired);
    }

    #[tokio::test]
    async fn test_revoke_sets_timestamp_once() {
        let store = MemoryRefreshTokenStore::new();
        store.put("to-revoke", Uuid::new_v4()).await.unwrap();

        let first = store.revoke("to-revoke").await.unwrap();
        let first_revoked_at = first.revoked_at.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let second = store.revoke("to-revoke").await.unwrap();
        assert_eq!(second.revoked_at, Some(first_revoked_at));
        assert_eq!(second.updated_at, first.updated_at);

        let stored = store.get_by_token("to-revoke").await.unwrap();
        assert_eq!(stored.revoked_at, Some(first_revoked_at));
    }

    #[tokio::test]
    async fn test_revoke_unknown_token_is_not_found() {
        let store = MemoryRefreshTokenStore::new();

        let result = store.revoke("never-issued").await;
        assert!(matches!(result, Err(RefreshTokenRepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_user_store_insert_and_find() {
        let store = MemoryUserStore::new();
        let user = store.insert("walt@breakingbad.com", "$2b$10$hash").unwrap();

        let found = store
            .find_by_email("walt@breakingbad.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.hashed_password, "$2b$10$hash");

        assert!(store.find_by_email("saul@bettercall.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_store_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.insert("dup@example.com", "h1").unwrap();

        let result = store.insert("dup@example.com", "h2");
        assert!(matches!(result, Err(UserRepositoryError::EmailAlreadyExists)));
    }

    #[tokio::test]
    async fn test_user_store_concurrent_create_same_email() {
        let store = Arc::new(MemoryUserStore::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create("race@example.com", "h").await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, UserRepositoryError::EmailAlreadyExists)),
            }
        }
        assert_eq!(created, 1);
    }
}
