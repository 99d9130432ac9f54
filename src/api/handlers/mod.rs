//! Route handlers.
//!
//! Handlers get the shared [`AuthState`] through an `Extension` layer. Login
//! and registration finish the same way: start a session, set the cookie, and
//! redirect to `/secrets`.

pub mod external;
pub mod health;
pub mod local;
pub mod pages;
pub mod secrets;
pub mod session;


use super::views;
use crate::{
    auth::{AuthError, AuthState},
    store::Account,
};
use axum::{
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use tracing::error;

/// Generic 500 page. Details go to the log, never to the visitor.
pub(crate) fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, views::error()).into_response()
}

/// Log an unexpected auth failure and answer with the generic error page.
pub(crate) fn internal_failure(context: &str, err: &AuthError) -> Response {
    error!("{context}: {err}");
    server_error()
}

/// Start a session for `account` and send the visitor to `/secrets`.
///
/// `extra_cookies` are appended before the session cookie (e.g. clearing the
/// OAuth state cookie).
pub(crate) async fn establish_session(
    auth_state: &AuthState,
    account: &Account,
    extra_cookies: Vec<HeaderValue>,
) -> Response {
    let token = match auth_state.sessions().login(account).await {
        Ok(token) => token,
        Err(err) => return internal_failure("Failed to start session", &err),
    };

    let cookie = match session::session_cookie(auth_state.config(), token.as_str()) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return server_error();
        }
    };

    let mut headers = HeaderMap::new();
    for extra in extra_cookies {
        headers.append(SET_COOKIE, extra);
    }
    headers.append(SET_COOKIE, cookie);

    (headers, Redirect::to("/secrets")).into_response()
}
