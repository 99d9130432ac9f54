//! In-process store used by tests and local experiments.
//!
//! Uniqueness checks and inserts happen under a single write lock, which gives
//! the same guarantees as the unique indexes of the Postgres schema.

use super::{Account, AccountStore, NewAccount, SessionStore, StoreError};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    // Insertion order doubles as creation order for `list_with_secrets`.
    accounts: RwLock<Vec<Account>>,
    sessions: RwLock<HashMap<Vec<u8>, (Uuid, Instant)>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .find(|a| a.username.as_deref() == Some(username))
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .find(|a| a.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        let taken = accounts.iter().any(|existing| {
            let same_username = account.username().is_some()
                && existing.username.as_deref() == account.username();
            let same_external = account.external_id().is_some()
                && existing.external_id.as_deref() == account.external_id();
            same_username || same_external
        });
        if taken {
            return Err(StoreError::Conflict);
        }

        let created = account.into_account(Uuid::new_v4());
        accounts.push(created.clone());
        Ok(created)
    }

    async fn set_secret(&self, id: Uuid, secret: &str) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write().await;
        match accounts.iter_mut().find(|a| a.id == id) {
            Some(account) => {
                account.secret = Some(secret.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_with_secrets(&self) -> Result<Vec<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.iter().filter(|a| a.has_secret()).cloned().collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(
        &self,
        token_hash: &[u8],
        account_id: Uuid,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(token_hash) {
            return Err(StoreError::Conflict);
        }
        sessions.insert(token_hash.to_vec(), (account_id, Instant::now() + ttl));
        Ok(())
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<Uuid>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(token_hash)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(account_id, _)| *account_id))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<(), StoreError> {
        self.sessions.write().await.remove(token_hash);
        Ok(())
    }

    async fn purge_expired_sessions(&self) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let now = Instant::now();
        sessions.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(u64::try_from(before - sessions.len()).unwrap_or(u64::MAX))
    }
}
