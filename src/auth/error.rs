use crate::store::StoreError;
use thiserror::Error;

/// Failures of the authentication flows.
///
/// Route handlers must not surface the difference between `NotFound` and
/// `InvalidCredential` to the client.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("account already exists")]
    DuplicateAccount,
    #[error("account not found")]
    NotFound,
    #[error("invalid credential")]
    InvalidCredential,
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("store unavailable")]
    StoreUnavailable(#[source] StoreError),
    #[error("identity provider failure: {0}")]
    ProviderFailure(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::StoreUnavailable(err)
    }
}

impl AuthError {
    /// Errors caused by what the visitor typed, recovered by sending them back to the form.
    #[must_use]
    pub const fn is_local_flow(&self) -> bool {
        matches!(
            self,
            Self::DuplicateAccount | Self::NotFound | Self::InvalidCredential | Self::InvalidInput(_)
        )
    }
}
