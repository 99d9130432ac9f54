use crate::auth::MAX_SESSION_TTL_SECONDS;
use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

pub const ARG_BASE_URL: &str = "base-url";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone)]
pub struct Options {
    pub base_url: String,
    pub session_ttl_seconds: u64,
}

impl Options {
    /// Read the auth options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if the base URL is not an absolute http(s) URL.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let base_url = matches
            .get_one::<String>(ARG_BASE_URL)
            .cloned()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let parsed = url::Url::parse(&base_url)
            .map_err(|err| anyhow::anyhow!("invalid --{ARG_BASE_URL} {base_url}: {err}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("--{ARG_BASE_URL} must use http or https: {base_url}");
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(43_200),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BASE_URL)
                .long(ARG_BASE_URL)
                .help("Public base URL of the site")
                .long_help(
                    "Public base URL of the site. Session cookies are marked Secure when it uses https, and the default Google callback URL is derived from it.",
                )
                .env("SECRETS_BASE_URL")
                .default_value(DEFAULT_BASE_URL),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds (at most one year)")
                .env("SECRETS_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_SESSION_TTL_SECONDS)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> Command {
        with_args(Command::new("secrets"))
    }

    #[test]
    fn defaults() -> Result<()> {
        temp_env::with_vars(
            [
                ("SECRETS_BASE_URL", None::<&str>),
                ("SECRETS_SESSION_TTL_SECONDS", None),
            ],
            || {
                let options = Options::parse(&command().get_matches_from(["secrets"]))?;
                assert_eq!(options.base_url, "http://localhost:8080");
                assert_eq!(options.session_ttl_seconds, 43_200);
                Ok(())
            },
        )
    }

    #[test]
    fn env_overrides_and_trailing_slash() -> Result<()> {
        temp_env::with_vars(
            [
                ("SECRETS_BASE_URL", Some("https://secrets.dev/")),
                ("SECRETS_SESSION_TTL_SECONDS", Some("600")),
            ],
            || {
                let options = Options::parse(&command().get_matches_from(["secrets"]))?;
                assert_eq!(options.base_url, "https://secrets.dev");
                assert_eq!(options.session_ttl_seconds, 600);
                Ok(())
            },
        )
    }

    #[test]
    fn rejects_non_http_base_url() {
        let matches = command().get_matches_from(["secrets", "--base-url", "ftp://secrets.dev"]);
        assert!(Options::parse(&matches).is_err());
        let matches = command().get_matches_from(["secrets", "--base-url", "not a url"]);
        assert!(Options::parse(&matches).is_err());
    }

    #[test]
    fn rejects_zero_ttl() {
        assert!(command()
            .try_get_matches_from(["secrets", "--session-ttl-seconds", "0"])
            .is_err());
    }

    #[test]
    fn ttl_is_bounded_to_one_year() -> Result<()> {
        let max = MAX_SESSION_TTL_SECONDS.to_string();
        let matches =
            command().try_get_matches_from(["secrets", "--session-ttl-seconds", max.as_str()])?;
        assert_eq!(
            Options::parse(&matches)?.session_ttl_seconds,
            MAX_SESSION_TTL_SECONDS
        );

        let too_long = (MAX_SESSION_TTL_SECONDS + 1).to_string();
        assert!(command()
            .try_get_matches_from(["secrets", "--session-ttl-seconds", too_long.as_str()])
            .is_err());
        assert!(command()
            .try_get_matches_from(["secrets", "--session-ttl-seconds", "18446744073709551615"])
            .is_err());
        Ok(())
    }
}
