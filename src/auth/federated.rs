//! Find-or-create of accounts for federated logins.

use super::{error::AuthError, provider::ExternalProfile};
use crate::store::{Account, AccountStore, NewAccount, StoreError};
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Clone)]
pub struct FederatedResolver {
    accounts: Arc<dyn AccountStore>,
}

impl FederatedResolver {
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Map a provider profile to an account, creating one on first login.
    ///
    /// The external id is unique in the store. When a concurrent login for the
    /// same id wins the insert, the conflict is answered by reading the winner.
    ///
    /// # Errors
    /// `StoreUnavailable` on store failures; nothing is retried beyond the
    /// single re-read after a conflict.
    #[instrument(skip_all)]
    pub async fn resolve(&self, profile: &ExternalProfile) -> Result<Account, AuthError> {
        if let Some(account) = self
            .accounts
            .find_by_external_id(&profile.external_id)
            .await?
        {
            return Ok(account);
        }

        let new_account =
            NewAccount::federated(profile.external_id.clone(), profile.email.clone());
        match self.accounts.create(new_account).await {
            Ok(account) => {
                info!(account_id = %account.id, "federated account created");
                Ok(account)
            }
            Err(StoreError::Conflict) => {
                debug!("federated account created concurrently, reading winner");
                self.accounts
                    .find_by_external_id(&profile.external_id)
                    .await?
                    .ok_or_else(|| {
                        AuthError::Internal("external id conflicted but no account found".into())
                    })
            }
            Err(err) => Err(err.into()),
        }
    }
}
