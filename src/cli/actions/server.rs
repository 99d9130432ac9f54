use crate::{
    api,
    auth::{AuthConfig, GoogleConfig},
    cli::telemetry,
};
use anyhow::Result;
use std::fmt;
use tracing::{debug, info};
use url::Url;

#[derive(Clone)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub base_url: String,
    pub session_ttl_seconds: u64,
    pub google: Option<GoogleConfig>,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &redact_dsn(&self.dsn))
            .field("base_url", &self.base_url)
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("google", &self.google)
            .finish()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let auth_config =
        AuthConfig::new(args.base_url).with_session_ttl_seconds(args.session_ttl_seconds);

    info!(dsn = %redact_dsn(&args.dsn), "Connecting to database");

    let result = api::new(args.port, args.dsn, auth_config, args.google).await;

    telemetry::shutdown_tracer();

    result
}

/// DSN with the password masked, for logs.
fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("***")).is_err() {
                return "<redacted>".to_string();
            }
            url.to_string()
        }
        Err(_) => "<unparseable>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn redact_dsn_masks_password() {
        assert_eq!(
            redact_dsn("postgres://app:hunter2@db:5432/secrets"),
            "postgres://app:***@db:5432/secrets"
        );
        assert_eq!(
            redact_dsn("postgres://app@db/secrets"),
            "postgres://app@db/secrets"
        );
        assert_eq!(redact_dsn("host=db password=x"), "<unparseable>");
    }

    #[test]
    fn debug_hides_credentials() {
        let args = Args {
            port: 8080,
            dsn: "postgres://app:hunter2@db/secrets".to_string(),
            base_url: "http://localhost:8080".to_string(),
            session_ttl_seconds: 60,
            google: Some(GoogleConfig {
                client_id: "id".to_string(),
                client_secret: SecretString::from("client-secret-value"),
                redirect_url: "http://localhost:8080/auth/external/callback".to_string(),
            }),
        };
        let debug = format!("{args:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("client-secret-value"));
        assert!(debug.contains("port: 8080"));
    }
}
