//! Auth configuration and the shared state handed to route handlers.

use super::{
    credentials::CredentialVerifier, federated::FederatedResolver, provider::IdentityProvider,
    session::SessionManager,
};
use crate::store::{AccountStore, SessionStore};
use std::{sync::Arc, time::Duration};

const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;
/// Longest accepted session lifetime (one year); session expiry must stay
/// representable both as an `Instant` and as a Postgres timestamp.
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: String,
    session_ttl_seconds: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    /// Clamped to `1..=MAX_SESSION_TTL_SECONDS`.
    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds.clamp(1, MAX_SESSION_TTL_SECONDS);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    /// Only mark cookies secure when the site is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

/// Everything the route handlers need, built once at startup.
pub struct AuthState {
    config: AuthConfig,
    accounts: Arc<dyn AccountStore>,
    credentials: CredentialVerifier,
    federated: FederatedResolver,
    sessions: SessionManager,
    provider: Option<Arc<dyn IdentityProvider>>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        accounts: Arc<dyn AccountStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let ttl = Duration::from_secs(config.session_ttl_seconds());
        Self {
            credentials: CredentialVerifier::new(accounts.clone()),
            federated: FederatedResolver::new(accounts.clone()),
            sessions: SessionManager::new(sessions, accounts.clone(), ttl),
            accounts,
            config,
            provider: None,
        }
    }

    /// Enable federated login. Without a provider the external routes answer 404.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn accounts(&self) -> &Arc<dyn AccountStore> {
        &self.accounts
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialVerifier {
        &self.credentials
    }

    #[must_use]
    pub fn federated(&self) -> &FederatedResolver {
        &self.federated
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    #[must_use]
    pub fn provider(&self) -> Option<&Arc<dyn IdentityProvider>> {
        self.provider.as_ref()
    }
}
