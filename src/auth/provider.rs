//! Third-party identity providers (OAuth2 authorization-code flow).

use super::error::AuthError;
use crate::APP_USER_AGENT;
use anyhow::{Context, Result};
use async_trait::async_trait;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Scopes requested from the provider.
pub const SCOPES: [&str; 2] = ["profile", "email"];

/// What we keep from a provider profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalProfile {
    /// Stable subject id issued by the provider.
    pub external_id: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// URL the visitor is redirected to, carrying `state` for CSRF protection.
    fn authorize_url(&self, state: &str) -> Url;

    /// Exchange the callback `code` for the visitor's profile.
    async fn exchange(&self, code: &str) -> Result<ExternalProfile, AuthError>;
}

/// Google client registration.
#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_url: String,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

type GoogleClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

pub struct GoogleProvider {
    client: GoogleClient,
    http: reqwest::Client,
    userinfo_url: String,
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
}

impl GoogleProvider {
    /// Build the OAuth2 client for Google.
    ///
    /// # Errors
    /// Returns an error if an endpoint URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &GoogleConfig) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(
                config.client_secret.expose_secret().to_string(),
            ))
            .set_auth_uri(AuthUrl::new(GOOGLE_AUTH_URL.to_string())?)
            .set_token_uri(TokenUrl::new(GOOGLE_TOKEN_URL.to_string())?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_url.clone())
                    .with_context(|| format!("invalid redirect URL: {}", config.redirect_url))?,
            );

        // Following redirects during the token exchange would open an SSRF hole.
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            http,
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorize_url(&self, state: &str) -> Url {
        let state = state.to_string();
        let (url, _state) = self
            .client
            .authorize_url(move || CsrfToken::new(state))
            .add_scopes(SCOPES.iter().map(|scope| Scope::new((*scope).to_string())))
            .url();
        url
    }

    #[instrument(skip_all, fields(provider = "google"))]
    async fn exchange(&self, code: &str) -> Result<ExternalProfile, AuthError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|err| AuthError::ProviderFailure(format!("token exchange failed: {err}")))?;

        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .map_err(|err| AuthError::ProviderFailure(format!("userinfo request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(AuthError::ProviderFailure(format!(
                "userinfo returned {}",
                response.status()
            )));
        }

        let profile: GoogleUserInfo = response
            .json()
            .await
            .map_err(|err| AuthError::ProviderFailure(format!("invalid userinfo: {err}")))?;

        if profile.sub.trim().is_empty() {
            return Err(AuthError::ProviderFailure("userinfo without subject".into()));
        }

        debug!("provider profile fetched");
        Ok(ExternalProfile {
            external_id: profile.sub,
            email: profile.email,
        })
    }
}
