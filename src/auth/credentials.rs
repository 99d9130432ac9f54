//! Local username/password accounts.
//!
//! Passwords are stored as Argon2id PHC strings (random salt per account).
//! Verification goes through `argon2`'s `PasswordVerifier`, which compares the
//! derived hash in constant time. Hashing is CPU bound and runs on the blocking
//! pool.

use super::{
    error::AuthError,
    utils::{normalize_username, valid_username},
};
use crate::store::{Account, AccountStore, NewAccount, StoreError};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tracing::{debug, info, instrument};

#[derive(Clone)]
pub struct CredentialVerifier {
    accounts: Arc<dyn AccountStore>,
}

impl CredentialVerifier {
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Create a local account.
    ///
    /// # Errors
    /// `InvalidInput` for an unusable username or empty password,
    /// `DuplicateAccount` if the username is taken, `StoreUnavailable` on store failures.
    #[instrument(skip_all)]
    pub async fn register(&self, username: &str, password: &str) -> Result<Account, AuthError> {
        let username = normalize_username(username);
        if !valid_username(&username) {
            return Err(AuthError::InvalidInput("username"));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password"));
        }

        let password = password.to_owned();
        let password_hash = spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|err| AuthError::Internal(err.to_string()))??;

        // The unique index decides duplicates; a pre-check would race.
        match self
            .accounts
            .create(NewAccount::local(username, password_hash))
            .await
        {
            Ok(account) => {
                info!(account_id = %account.id, "local account registered");
                Ok(account)
            }
            Err(StoreError::Conflict) => {
                debug!("registration rejected: username taken");
                Err(AuthError::DuplicateAccount)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Check a username/password pair.
    ///
    /// Every call runs one Argon2 verification, against a placeholder hash when
    /// the account is unknown or has no local password, so latency does not
    /// tell which usernames exist.
    ///
    /// # Errors
    /// `NotFound` if no account has this username, `InvalidCredential` if the
    /// password does not match or the account has no local password.
    #[instrument(skip_all)]
    pub async fn verify(&self, username: &str, password: &str) -> Result<Account, AuthError> {
        let username = normalize_username(username);
        let account = if valid_username(&username) {
            self.accounts.find_by_username(&username).await?
        } else {
            None
        };

        let password_hash = account.as_ref().and_then(|a| a.password_hash.clone());
        let password = password.to_owned();
        let matches = spawn_blocking(move || password_matches(&password, password_hash.as_deref()))
            .await
            .map_err(|err| AuthError::Internal(err.to_string()))??;

        match account {
            None => Err(AuthError::NotFound),
            Some(account) if matches => Ok(account),
            Some(_) => Err(AuthError::InvalidCredential),
        }
    }
}

// Argon2id hash of a throwaway password, same parameters as real accounts.
static PLACEHOLDER_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("placeholder-never-matches").ok());

/// Verify against the stored hash, or burn the same work on the placeholder
/// when there is none. A missing hash never matches.
fn password_matches(password: &str, password_hash: Option<&str>) -> Result<bool, AuthError> {
    match password_hash {
        Some(password_hash) => verify_password(password, password_hash),
        None => {
            if let Some(placeholder) = PLACEHOLDER_HASH.as_deref() {
                verify_password(password, placeholder)?;
            }
            Ok(false)
        }
    }
}

/// Hash a password with Argon2id and a fresh random salt.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Internal(format!("password hashing failed: {err}")))
}

fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|err| AuthError::Internal(format!("stored password hash unreadable: {err}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(AuthError::Internal(format!(
            "password verification failed: {err}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use anyhow::Result;
    use std::time::Instant;

    fn verifier() -> (Arc<MemoryStore>, CredentialVerifier) {
        let store = Arc::new(MemoryStore::new());
        let verifier = CredentialVerifier::new(store.clone());
        (store, verifier)
    }

    #[test]
    fn hash_is_salted() -> Result<()> {
        let first = hash_password("hunter2")?;
        let second = hash_password("hunter2")?;
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &first)?);
        assert!(!verify_password("hunter3", &first)?);
        Ok(())
    }

    #[tokio::test]
    async fn register_then_verify() -> Result<()> {
        let (_store, verifier) = verifier();
        let account = verifier.register("alice@example.com", "s3cret").await?;
        assert_eq!(account.username.as_deref(), Some("alice@example.com"));
        assert!(account.password_hash.is_some());

        let verified = verifier.verify("Alice@Example.com ", "s3cret").await?;
        assert_eq!(verified, account);
        Ok(())
    }

    #[tokio::test]
    async fn register_twice_is_duplicate() -> Result<()> {
        let (store, verifier) = verifier();
        verifier.register("bob", "pw-one").await?;
        let second = verifier.register("BOB", "pw-two").await;
        assert!(matches!(second, Err(AuthError::DuplicateAccount)));
        assert_eq!(store.account_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_blank_input() {
        let (store, verifier) = verifier();
        assert!(matches!(
            verifier.register("  ", "pw").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            verifier.register("carol", "").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert_eq!(store.account_count().await, 0);
    }

    #[tokio::test]
    async fn verify_wrong_password_and_unknown_user() -> Result<()> {
        let (_store, verifier) = verifier();
        verifier.register("dave", "right").await?;
        assert!(matches!(
            verifier.verify("dave", "wrong").await,
            Err(AuthError::InvalidCredential)
        ));
        assert!(matches!(
            verifier.verify("nobody", "right").await,
            Err(AuthError::NotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn verify_never_matches_federated_accounts() -> Result<()> {
        let (store, verifier) = verifier();
        store
            .create(NewAccount::federated("sub-2".into(), None))
            .await?;
        assert!(matches!(
            verifier.verify("sub-2", "anything").await,
            Err(AuthError::NotFound)
        ));
        Ok(())
    }

    #[test]
    fn placeholder_hash_costs_as_much_as_a_real_one() -> Result<()> {
        let placeholder = PLACEHOLDER_HASH
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("placeholder hash missing"))?;
        let real = hash_password("hunter2")?;

        let placeholder = PasswordHash::new(placeholder).map_err(|e| anyhow::anyhow!("{e}"))?;
        let real = PasswordHash::new(&real).map_err(|e| anyhow::anyhow!("{e}"))?;
        assert_eq!(placeholder.algorithm.as_str(), real.algorithm.as_str());
        assert_eq!(placeholder.version, real.version);
        assert_eq!(placeholder.params.to_string(), real.params.to_string());
        Ok(())
    }

    #[test]
    fn missing_hash_never_matches() -> Result<()> {
        assert!(!password_matches("placeholder-never-matches", None)?);
        assert!(!password_matches("", None)?);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_user_takes_as_long_as_wrong_password() -> Result<()> {
        const ROUNDS: u32 = 3;
        let (_store, verifier) = verifier();
        verifier.register("erin", "right").await?;
        // Build the placeholder outside the timed section.
        assert!(!password_matches("warm-up", None)?);

        let timed = |username: &'static str| {
            let verifier = verifier.clone();
            async move {
                let started = Instant::now();
                for _ in 0..ROUNDS {
                    assert!(verifier.verify(username, "wrong").await.is_err());
                }
                started.elapsed() / ROUNDS
            }
        };

        let wrong_password = timed("erin").await;
        let unknown_user = timed("nobody").await;
        let invalid_username = timed("   ").await;

        // Both paths do one Argon2 verification; store lookups are noise next to it.
        assert!(
            unknown_user * 4 > wrong_password,
            "unknown user {unknown_user:?} vs wrong password {wrong_password:?}"
        );
        assert!(
            invalid_username * 4 > wrong_password,
            "invalid username {invalid_username:?} vs wrong password {wrong_password:?}"
        );
        Ok(())
    }
}
