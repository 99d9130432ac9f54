//! Account and session persistence.
//!
//! Handlers never talk to a database directly; they go through the
//! [`AccountStore`] and [`SessionStore`] traits. Uniqueness of usernames and
//! external identity ids is the store's job: both implementations reject a
//! second account for the same key with [`StoreError::Conflict`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::{fmt, time::Duration};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key (username or external id) is already bound to an account.
    #[error("unique constraint violated")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persisted identity record.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub username: Option<String>,
    pub email: Option<String>,
    /// Argon2 PHC string (algorithm, params, salt and hash).
    pub password_hash: Option<String>,
    pub external_id: Option<String>,
    pub secret: Option<String>,
}

impl Account {
    #[must_use]
    pub fn has_secret(&self) -> bool {
        self.secret.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "***"))
            .field("external_id", &self.external_id)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Insert payload for a new account.
///
/// Only the two constructors exist, so every account is reachable by at least
/// one authentication path.
#[derive(Clone)]
pub struct NewAccount {
    username: Option<String>,
    email: Option<String>,
    password_hash: Option<String>,
    external_id: Option<String>,
}

impl NewAccount {
    #[must_use]
    pub fn local(username: String, password_hash: String) -> Self {
        Self {
            username: Some(username),
            email: None,
            password_hash: Some(password_hash),
            external_id: None,
        }
    }

    #[must_use]
    pub fn federated(external_id: String, email: Option<String>) -> Self {
        Self {
            username: None,
            email,
            password_hash: None,
            external_id: Some(external_id),
        }
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    pub(crate) fn into_account(self, id: Uuid) -> Account {
        Account {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            external_id: self.external_id,
            secret: None,
        }
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_external_id(&self, external_id: &str)
        -> Result<Option<Account>, StoreError>;

    /// Insert a new account.
    ///
    /// # Errors
    /// Returns [`StoreError::Conflict`] when the username or external id is taken.
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Replace the secret of an account. Returns `false` if the account is gone.
    async fn set_secret(&self, id: Uuid, secret: &str) -> Result<bool, StoreError>;

    /// Accounts whose secret is set and not blank, oldest first.
    async fn list_with_secrets(&self) -> Result<Vec<Account>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `token_hash -> account_id` until `ttl` elapses.
    ///
    /// # Errors
    /// Returns [`StoreError::Conflict`] if the hash already exists.
    async fn insert_session(
        &self,
        token_hash: &[u8],
        account_id: Uuid,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Account id for an unexpired session, if any.
    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<Uuid>, StoreError>;

    /// Remove a session; removing a missing session is not an error.
    async fn delete_session(&self, token_hash: &[u8]) -> Result<(), StoreError>;

    /// Drop expired sessions, returning how many were removed.
    async fn purge_expired_sessions(&self) -> Result<u64, StoreError>;
}
