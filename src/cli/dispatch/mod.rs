//! Map parsed CLI arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, google, ARG_DSN, ARG_PORT};
use anyhow::{Context, Result};
use tracing::warn;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let google_opts = google::Options::parse(matches);
    if google_opts.is_partial() {
        warn!(
            "Google login needs both --{} and --{}; federated login disabled",
            google::ARG_GOOGLE_CLIENT_ID,
            google::ARG_GOOGLE_CLIENT_SECRET
        );
    }
    let google = google_opts.config(&auth_opts.base_url);

    Ok(Action::Server(Args {
        port,
        dsn,
        base_url: auth_opts.base_url,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        google,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DSN: &str = "postgres://user@localhost:5432/secrets";

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(
            [
                ("SECRETS_DSN", Some(DSN)),
                ("SECRETS_PORT", Some("9000")),
                ("SECRETS_BASE_URL", Some("https://secrets.dev")),
                ("SECRETS_SESSION_TTL_SECONDS", Some("120")),
                ("SECRETS_GOOGLE_CLIENT_ID", Some("client-id")),
                ("SECRETS_GOOGLE_CLIENT_SECRET", Some("client-secret")),
                ("SECRETS_GOOGLE_CALLBACK_URL", None),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["secrets"]);
                let result = handler(&matches);
                assert!(result.is_ok());
                if let Ok(Action::Server(args)) = result {
                    assert_eq!(args.port, 9000);
                    assert_eq!(args.dsn, DSN);
                    assert_eq!(args.base_url, "https://secrets.dev");
                    assert_eq!(args.session_ttl_seconds, 120);
                    assert_eq!(
                        args.google.map(|google| google.redirect_url),
                        Some("https://secrets.dev/auth/external/callback".to_string())
                    );
                }
            },
        );
    }

    #[test]
    fn google_disabled_when_half_configured() {
        temp_env::with_vars(
            [
                ("SECRETS_DSN", Some(DSN)),
                ("SECRETS_GOOGLE_CLIENT_ID", Some("client-id")),
                ("SECRETS_GOOGLE_CLIENT_SECRET", None),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["secrets"]);
                let result = handler(&matches);
                assert!(matches!(result, Ok(Action::Server(Args { google: None, .. }))));
            },
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        temp_env::with_vars(
            [
                ("SECRETS_DSN", Some(DSN)),
                ("SECRETS_BASE_URL", Some("localhost")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["secrets"]);
                assert!(handler(&matches).is_err());
            },
        );
    }
}
