use crate::{api::views, auth::AuthState};
use axum::{extract::Extension, response::IntoResponse};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Landing page", body = String, content_type = "text/html")
    ),
    tag = "secrets"
)]
pub async fn home(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    views::home(auth_state.provider().is_some())
}
