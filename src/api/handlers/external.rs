//! Federated login through the configured identity provider.
//!
//! `/auth/external` stores a random `state` in a short-lived cookie and
//! redirects to the provider. The callback only proceeds when the returned
//! `state` matches that cookie; the cookie is cleared either way.

use super::{
    establish_session, internal_failure,
    session::{build_cookie, extract_cookie},
};
use crate::auth::{utils::generate_token, AuthError, AuthState};
use axum::{
    extract::{Extension, Query},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::IntoParams;

pub(crate) const OAUTH_STATE_COOKIE_NAME: &str = "secrets_oauth_state";
const OAUTH_STATE_TTL_SECONDS: u64 = 600;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    /// Authorization code issued by the provider.
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the visitor denied access or the request failed.
    pub error: Option<String>,
}

impl std::fmt::Debug for CallbackQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackQuery")
            .field("code", &self.code.as_ref().map(|_| "***"))
            .field("state", &self.state.as_ref().map(|_| "***"))
            .field("error", &self.error)
            .finish()
    }
}

#[utoipa::path(
    get,
    path = "/auth/external",
    responses(
        (status = 303, description = "Redirect to the identity provider"),
        (status = 404, description = "Federated login is not configured")
    ),
    tag = "auth"
)]
pub async fn begin(auth_state: Extension<Arc<AuthState>>) -> Response {
    let Some(provider) = auth_state.provider() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let state = match generate_token() {
        Ok(state) => state,
        Err(err) => {
            return internal_failure(
                "Failed to generate OAuth state",
                &AuthError::Internal(err.to_string()),
            )
        }
    };

    let cookie = match build_cookie(
        auth_state.config(),
        OAUTH_STATE_COOKIE_NAME,
        &state,
        OAUTH_STATE_TTL_SECONDS,
    ) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build OAuth state cookie: {err}");
            return super::server_error();
        }
    };

    let url = provider.authorize_url(&state);
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    (headers, Redirect::to(url.as_str())).into_response()
}

#[utoipa::path(
    get,
    path = "/auth/external/callback",
    params(CallbackQuery),
    responses(
        (status = 303, description = "Logged in, redirect to /secrets; provider failure redirects to /login"),
        (status = 404, description = "Federated login is not configured"),
        (status = 500, description = "Store unavailable", body = String, content_type = "text/html")
    ),
    tag = "auth"
)]
pub async fn callback(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(provider) = auth_state.provider() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let expected_state = extract_cookie(&headers, OAUTH_STATE_COOKIE_NAME);
    let clear_state = build_cookie(auth_state.config(), OAUTH_STATE_COOKIE_NAME, "", 0).ok();
    let back_to_login = |clear_state: Option<HeaderValue>| {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = clear_state {
            headers.insert(SET_COOKIE, cookie);
        }
        (headers, Redirect::to("/login")).into_response()
    };

    if let Some(error) = query.error.as_deref() {
        warn!(provider = provider.name(), "Provider returned error: {error}");
        return back_to_login(clear_state);
    }

    let (Some(code), Some(state)) = (query.code.as_deref(), query.state.as_deref()) else {
        warn!(provider = provider.name(), "Callback without code or state");
        return back_to_login(clear_state);
    };

    if expected_state.as_deref() != Some(state) {
        warn!(provider = provider.name(), "OAuth state mismatch");
        return back_to_login(clear_state);
    }

    let profile = match provider.exchange(code).await {
        Ok(profile) => profile,
        Err(err) => {
            warn!(provider = provider.name(), "Federated login failed: {err}");
            return back_to_login(clear_state);
        }
    };

    let account = match auth_state.federated().resolve(&profile).await {
        Ok(account) => account,
        Err(err) => return internal_failure("Failed to resolve federated account", &err),
    };

    establish_session(
        &auth_state,
        &account,
        clear_state.into_iter().collect(),
    )
    .await
}
