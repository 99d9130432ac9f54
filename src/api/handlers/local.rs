//! Local username/password registration and login.

use super::{establish_session, internal_failure};
use crate::{api::views, auth::AuthState};
use axum::{
    extract::{Extension, Form, Query},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

/// Body of the register and login forms. Missing fields are empty strings.
#[derive(Deserialize, ToSchema)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for CredentialsForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsForm")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Set after a failed login to show the error banner.
    pub error: Option<String>,
}

#[utoipa::path(
    get,
    path = "/register",
    responses(
        (status = 200, description = "Registration form", body = String, content_type = "text/html")
    ),
    tag = "auth"
)]
pub async fn register_page(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    views::register(auth_state.provider().is_some())
}

#[utoipa::path(
    post,
    path = "/register",
    request_body(content = CredentialsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Registered and logged in, redirect to /secrets; on failure redirect to /register"),
        (status = 500, description = "Store unavailable", body = String, content_type = "text/html")
    ),
    tag = "auth"
)]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    Form(form): Form<CredentialsForm>,
) -> Response {
    match auth_state
        .credentials()
        .register(&form.username, &form.password)
        .await
    {
        Ok(account) => establish_session(&auth_state, &account, Vec::new()).await,
        Err(err) if err.is_local_flow() => {
            debug!("Registration rejected: {err}");
            Redirect::to("/register").into_response()
        }
        Err(err) => internal_failure("Failed to register account", &err),
    }
}

#[utoipa::path(
    get,
    path = "/login",
    params(LoginQuery),
    responses(
        (status = 200, description = "Login form", body = String, content_type = "text/html")
    ),
    tag = "auth"
)]
pub async fn login_page(
    auth_state: Extension<Arc<AuthState>>,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    views::login(query.error.is_some(), auth_state.provider().is_some())
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = CredentialsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Logged in, redirect to /secrets; on failure redirect to /login?error=1"),
        (status = 500, description = "Store unavailable", body = String, content_type = "text/html")
    ),
    tag = "auth"
)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    Form(form): Form<CredentialsForm>,
) -> Response {
    match auth_state
        .credentials()
        .verify(&form.username, &form.password)
        .await
    {
        Ok(account) => establish_session(&auth_state, &account, Vec::new()).await,
        // Unknown user and wrong password must look the same to the visitor.
        Err(err) if err.is_local_flow() => {
            debug!("Login rejected: {err}");
            Redirect::to("/login?error=1").into_response()
        }
        Err(err) => internal_failure("Failed to verify credentials", &err),
    }
}
