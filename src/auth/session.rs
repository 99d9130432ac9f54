//! Server-side sessions.
//!
//! A session is `sha256(token) -> account id` in the session store, with an
//! expiry. The raw token only ever lives in the client cookie.

use super::{
    error::AuthError,
    utils::{generate_token, hash_session_token},
};
use crate::store::{Account, AccountStore, SessionStore, StoreError};
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument, warn};

const INSERT_ATTEMPTS: usize = 3;

/// Raw session token handed to the client.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    accounts: Arc<dyn AccountStore>,
    ttl: Duration,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        accounts: Arc<dyn AccountStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            sessions,
            accounts,
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session for `account`.
    ///
    /// # Errors
    /// `StoreUnavailable` if the session cannot be stored, `Internal` if the
    /// RNG fails or three generated tokens in a row collide.
    #[instrument(skip_all, fields(account_id = %account.id))]
    pub async fn login(&self, account: &Account) -> Result<SessionToken, AuthError> {
        for _ in 0..INSERT_ATTEMPTS {
            let token = generate_token().map_err(|err| AuthError::Internal(err.to_string()))?;
            let token_hash = hash_session_token(&token);
            match self
                .sessions
                .insert_session(&token_hash, account.id, self.ttl)
                .await
            {
                Ok(()) => {
                    debug!("session established");
                    return Ok(SessionToken(token));
                }
                Err(StoreError::Conflict) => warn!("session token collision, retrying"),
                Err(err) => return Err(err.into()),
            }
        }

        Err(AuthError::Internal(
            "failed to generate unique session token".into(),
        ))
    }

    /// Account behind a session token.
    ///
    /// Missing, expired, and dangling sessions (account gone) all resolve to `None`.
    ///
    /// # Errors
    /// `StoreUnavailable` on store failures.
    #[instrument(skip_all)]
    pub async fn resolve(&self, token: &str) -> Result<Option<Account>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }
        let token_hash = hash_session_token(token);
        let Some(account_id) = self.sessions.lookup_session(&token_hash).await? else {
            return Ok(None);
        };

        let account = self.accounts.find_by_id(account_id).await?;
        if account.is_none() {
            debug!(%account_id, "session references a missing account");
        }
        Ok(account)
    }

    /// End a session. Unknown tokens are ignored.
    ///
    /// # Errors
    /// `StoreUnavailable` on store failures.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let token_hash = hash_session_token(token);
        self.sessions.delete_session(&token_hash).await?;
        Ok(())
    }

    /// Remove expired sessions from the store.
    ///
    /// # Errors
    /// `StoreUnavailable` on store failures.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        Ok(self.sessions.purge_expired_sessions().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NewAccount};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn manager(store: &Arc<MemoryStore>, ttl: Duration) -> SessionManager {
        SessionManager::new(store.clone(), store.clone(), ttl)
    }

    #[tokio::test]
    async fn login_then_resolve_returns_account() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let sessions = manager(&store, Duration::from_secs(60));
        let account = store
            .create(NewAccount::local("alice".into(), "hash".into()))
            .await?;

        let token = sessions.login(&account).await?;
        assert_eq!(sessions.resolve(token.as_str()).await?, Some(account));
        Ok(())
    }

    #[tokio::test]
    async fn tokens_are_unique_per_login() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let sessions = manager(&store, Duration::from_secs(60));
        let account = store
            .create(NewAccount::federated("sub".into(), None))
            .await?;
        let first = sessions.login(&account).await?;
        let second = sessions.login(&account).await?;
        assert_ne!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn logout_is_idempotent() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let sessions = manager(&store, Duration::from_secs(60));
        let account = store
            .create(NewAccount::local("bob".into(), "hash".into()))
            .await?;
        let token = sessions.login(&account).await?;

        sessions.logout(token.as_str()).await?;
        assert_eq!(sessions.resolve(token.as_str()).await?, None);
        sessions.logout(token.as_str()).await?;
        assert_eq!(sessions.resolve(token.as_str()).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_and_expired_tokens_resolve_to_none() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let account = store
            .create(NewAccount::local("carol".into(), "hash".into()))
            .await?;

        let expired = manager(&store, Duration::ZERO);
        let token = expired.login(&account).await?;
        assert_eq!(expired.resolve(token.as_str()).await?, None);
        assert_eq!(expired.resolve("not-a-token").await?, None);
        assert_eq!(expired.resolve("").await?, None);
        assert_eq!(expired.purge_expired().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn dangling_session_resolves_to_none() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let sessions = manager(&store, Duration::from_secs(60));
        let ghost = NewAccount::local("ghost".into(), "hash".into()).into_account(Uuid::new_v4());

        let token = sessions.login(&ghost).await?;
        assert_eq!(sessions.resolve(token.as_str()).await?, None);
        Ok(())
    }

    /// Session store that reports a collision for the first `collisions` inserts.
    struct CollidingSessions {
        inner: MemoryStore,
        collisions: AtomicUsize,
    }

    #[async_trait]
    impl SessionStore for CollidingSessions {
        async fn insert_session(
            &self,
            token_hash: &[u8],
            account_id: Uuid,
            ttl: Duration,
        ) -> Result<(), StoreError> {
            if self.collisions.load(Ordering::SeqCst) > 0 {
                self.collisions.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::Conflict);
            }
            self.inner.insert_session(token_hash, account_id, ttl).await
        }

        async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<Uuid>, StoreError> {
            self.inner.lookup_session(token_hash).await
        }

        async fn delete_session(&self, token_hash: &[u8]) -> Result<(), StoreError> {
            self.inner.delete_session(token_hash).await
        }

        async fn purge_expired_sessions(&self) -> Result<u64, StoreError> {
            self.inner.purge_expired_sessions().await
        }
    }

    #[tokio::test]
    async fn login_retries_on_collision_then_gives_up() -> Result<()> {
        let accounts = Arc::new(MemoryStore::new());
        let account = accounts
            .create(NewAccount::local("dave".into(), "hash".into()))
            .await?;

        let flaky = Arc::new(CollidingSessions {
            inner: MemoryStore::new(),
            collisions: AtomicUsize::new(2),
        });
        let sessions = SessionManager::new(flaky, accounts.clone(), Duration::from_secs(60));
        assert!(sessions.login(&account).await.is_ok());

        let hopeless = Arc::new(CollidingSessions {
            inner: MemoryStore::new(),
            collisions: AtomicUsize::new(INSERT_ATTEMPTS),
        });
        let sessions = SessionManager::new(hopeless, accounts, Duration::from_secs(60));
        assert!(matches!(
            sessions.login(&account).await,
            Err(AuthError::Internal(_))
        ));
        Ok(())
    }
}
