use crate::{
    api::handlers::{external, health, local, pages, secrets, session},
    auth::{AuthConfig, AuthState, GoogleConfig, GoogleProvider},
    store::PgStore,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal, task::JoinHandle, time::interval};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, error, info, info_span, Span};
use ulid::Ulid;

pub(crate) mod handlers;
mod openapi;
mod views;

pub use openapi::openapi;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Build the application router around a ready [`AuthState`].
///
/// `/auth/google` and `/auth/google/secrets` are kept as aliases of the
/// federated routes for links that still point at them.
#[must_use]
pub fn router(auth_state: Arc<AuthState>) -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/register", get(local::register_page).post(local::register))
        .route("/login", get(local::login_page).post(local::login))
        .route("/secrets", get(secrets::list))
        .route("/submit", get(secrets::submit_page).post(secrets::submit))
        .route("/logout", get(session::logout))
        .route("/auth/external", get(external::begin))
        .route("/auth/external/callback", get(external::callback))
        .route("/auth/google", get(external::begin))
        .route("/auth/google/secrets", get(external::callback))
        .route("/health", get(health::health).options(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth_state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    auth_config: AuthConfig,
    google: Option<GoogleConfig>,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(PgStore::new(pool));
    store.migrate().await?;

    let mut auth_state = AuthState::new(auth_config, store.clone(), store);
    match google {
        Some(google) => {
            let provider =
                GoogleProvider::new(&google).context("Failed to configure Google login")?;
            info!("Federated login enabled (google)");
            auth_state = auth_state.with_provider(Arc::new(provider));
        }
        None => info!("Federated login disabled, no Google client configured"),
    }
    let auth_state = Arc::new(auth_state);

    spawn_session_purge(auth_state.clone(), SESSION_PURGE_INTERVAL);

    let app = router(auth_state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Periodically delete expired sessions; lookups already ignore them.
pub fn spawn_session_purge(auth_state: Arc<AuthState>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        loop {
            ticker.tick().await;
            match auth_state.sessions().purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "expired sessions purged"),
                Err(err) => error!("session purge failed: {err}"),
            }
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
