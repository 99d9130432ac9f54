//! Listing and submitting secrets.

use super::{server_error, session::current_account};
use crate::{api::views, auth::AuthState};
use axum::{
    extract::{Extension, Form},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct SecretForm {
    #[serde(default)]
    pub secret: String,
}

#[utoipa::path(
    get,
    path = "/secrets",
    responses(
        (status = 200, description = "Every non-empty secret, without owners", body = String, content_type = "text/html"),
        (status = 500, description = "Store unavailable", body = String, content_type = "text/html")
    ),
    tag = "secrets"
)]
pub async fn list(auth_state: Extension<Arc<AuthState>>) -> Response {
    match auth_state.accounts().list_with_secrets().await {
        Ok(accounts) => views::secrets(
            accounts
                .iter()
                .filter_map(|account| account.secret.as_deref()),
        )
        .into_response(),
        Err(err) => {
            error!("Failed to list secrets: {err}");
            server_error()
        }
    }
}

#[utoipa::path(
    get,
    path = "/submit",
    responses(
        (status = 200, description = "Secret submission form", body = String, content_type = "text/html"),
        (status = 303, description = "No session, redirect to /login")
    ),
    tag = "secrets"
)]
pub async fn submit_page(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    match current_account(&headers, &auth_state).await {
        Ok(Some(_)) => views::submit().into_response(),
        Ok(None) => Redirect::to("/login").into_response(),
        Err(_) => server_error(),
    }
}

#[utoipa::path(
    post,
    path = "/submit",
    request_body(content = SecretForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Secret stored, redirect to /secrets; no session redirects to /login"),
        (status = 500, description = "Store unavailable", body = String, content_type = "text/html")
    ),
    tag = "secrets"
)]
pub async fn submit(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    Form(form): Form<SecretForm>,
) -> Response {
    let account = match current_account(&headers, &auth_state).await {
        Ok(Some(account)) => account,
        Ok(None) => return Redirect::to("/login").into_response(),
        Err(_) => return server_error(),
    };

    // The secret itself is never logged.
    match auth_state
        .accounts()
        .set_secret(account.id, &form.secret)
        .await
    {
        Ok(true) => {
            info!(account_id = %account.id, "secret updated");
            Redirect::to("/secrets").into_response()
        }
        Ok(false) => {
            warn!(account_id = %account.id, "account vanished before its secret was stored");
            Redirect::to("/secrets").into_response()
        }
        Err(err) => {
            error!("Failed to store secret: {err}");
            server_error()
        }
    }
}
