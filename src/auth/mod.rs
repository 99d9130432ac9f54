//! Authentication and sessions.
//!
//! - [`CredentialVerifier`]: local username/password accounts (Argon2id).
//! - [`FederatedResolver`]: find-or-create of accounts for a provider subject id.
//! - [`SessionManager`]: opaque session tokens mapped to accounts in the session store.
//! - [`provider`]: the OAuth2 identity provider seam and its Google implementation.
//!
//! Every component holds its stores explicitly; [`AuthState`] bundles them
//! for the route handlers.

pub mod credentials;
pub mod error;
pub mod federated;
pub mod provider;
pub mod session;
mod state;
pub(crate) mod utils;

pub use credentials::CredentialVerifier;
pub use error::AuthError;
pub use federated::FederatedResolver;
pub use provider::{ExternalProfile, GoogleConfig, GoogleProvider, IdentityProvider};
pub use session::{SessionManager, SessionToken};
pub use state::{AuthConfig, AuthState, MAX_SESSION_TTL_SECONDS};
