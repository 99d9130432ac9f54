use crate::auth::GoogleConfig;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_GOOGLE_CLIENT_SECRET: &str = "google-client-secret";
pub const ARG_GOOGLE_CALLBACK_URL: &str = "google-callback-url";

const CALLBACK_PATH: &str = "/auth/external/callback";

#[derive(Debug, Clone)]
pub struct Options {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub callback_url: Option<String>,
}

impl Options {
    /// Read the Google client options from parsed matches. Blank values count as unset.
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            client_id: non_empty(ARG_GOOGLE_CLIENT_ID),
            client_secret: non_empty(ARG_GOOGLE_CLIENT_SECRET).map(SecretString::from),
            callback_url: non_empty(ARG_GOOGLE_CALLBACK_URL),
        }
    }

    /// Only one of client id and client secret was given.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.client_id.is_some() != self.client_secret.is_some()
    }

    /// Google client registration, or `None` when federated login is off.
    #[must_use]
    pub fn config(&self, base_url: &str) -> Option<GoogleConfig> {
        let client_id = self.client_id.clone()?;
        let client_secret = self.client_secret.clone()?;
        let redirect_url = self
            .callback_url
            .clone()
            .unwrap_or_else(|| format!("{}{CALLBACK_PATH}", base_url.trim_end_matches('/')));
        Some(GoogleConfig {
            client_id,
            client_secret,
            redirect_url,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("Google OAuth client id; federated login is off without it")
                .env("SECRETS_GOOGLE_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_SECRET)
                .long(ARG_GOOGLE_CLIENT_SECRET)
                .help("Google OAuth client secret")
                .env("SECRETS_GOOGLE_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CALLBACK_URL)
                .long(ARG_GOOGLE_CALLBACK_URL)
                .help("OAuth redirect URL registered with Google (default: <base-url>/auth/external/callback)")
                .env("SECRETS_GOOGLE_CALLBACK_URL"),
        )
}
