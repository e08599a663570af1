use crate::config::{normalize_server_domain, normalize_value};
use anyhow::{Context, anyhow};
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;
use url::Url;

pub const ARG_SERVER: &str = "server";
pub const ARG_DEV_PROXY: &str = "dev-proxy";
pub const ARG_TIMEOUT: &str = "timeout";

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub server: Option<String>,
    pub dev_proxy: Option<String>,
    pub timeout: Option<Duration>,
}

impl Options {
    /// Parse connection arguments from matches.
    ///
    /// # Errors
    /// Returns an error if `--server` is blank or either URL does not parse.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let server = match matches.get_one::<String>(ARG_SERVER) {
            Some(raw) => {
                let server = normalize_server_domain(raw)
                    .ok_or_else(|| anyhow!("invalid value for --{ARG_SERVER}: {raw:?}"))?;
                validate_base_url(ARG_SERVER, &server)?;
                Some(server)
            }
            None => None,
        };

        let dev_proxy = match matches
            .get_one::<String>(ARG_DEV_PROXY)
            .and_then(|v| normalize_value(v))
        {
            Some(proxy) => {
                validate_base_url(ARG_DEV_PROXY, &proxy)?;
                Some(proxy)
            }
            None => None,
        };

        Ok(Self {
            server,
            dev_proxy,
            timeout: matches
                .get_one::<u64>(ARG_TIMEOUT)
                .copied()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        })
    }
}

fn validate_base_url(arg: &str, value: &str) -> anyhow::Result<()> {
    let url = Url::parse(value).with_context(|| format!("invalid value for --{arg}: {value:?}"))?;
    if url.host_str().is_none() {
        return Err(anyhow!("invalid value for --{arg}: {value:?} has no host"));
    }
    Ok(())
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SERVER)
                .short('s')
                .long(ARG_SERVER)
                .help("ERPNext server URL, example: https://erp.example.com")
                .env("INNOMATE_SERVER")
                .global(true),
        )
        .arg(
            Arg::new(ARG_DEV_PROXY)
                .long(ARG_DEV_PROXY)
                .help("Send API calls through a local development proxy instead of the server URL")
                .long_help(
                    "Send API calls through a local development proxy, example: http://localhost:8102. The proxy must forward /api to the ERPNext server.",
                )
                .env("INNOMATE_DEV_PROXY")
                .global(true),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long(ARG_TIMEOUT)
                .help("Request timeout in seconds (0 disables the timeout)")
                .env("INNOMATE_TIMEOUT")
                .global(true)
                .value_parser(clap::value_parser!(u64)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Options> {
        let command = with_args(Command::new("test"));
        let matches = command.try_get_matches_from(args)?;
        Options::parse(&matches)
    }

    #[test]
    fn server_is_normalized() -> anyhow::Result<()> {
        temp_env::with_vars(
            [
                ("INNOMATE_SERVER", None::<String>),
                ("INNOMATE_DEV_PROXY", None),
                ("INNOMATE_TIMEOUT", None),
            ],
            || {
                let options = parse(&["test", "--server", "erp.example.com/", "--timeout", "0"])?;
                assert_eq!(options.server.as_deref(), Some("https://erp.example.com"));
                assert_eq!(options.dev_proxy, None);
                assert_eq!(options.timeout, None);
                Ok(())
            },
        )
    }

    #[test]
    fn bad_urls_are_rejected() {
        temp_env::with_vars(
            [
                ("INNOMATE_SERVER", None::<String>),
                ("INNOMATE_DEV_PROXY", None),
            ],
            || {
                assert!(parse(&["test", "--server", "  "]).is_err());
                assert!(parse(&["test", "--server", "https://exa mple.com"]).is_err());
                assert!(parse(&["test", "--dev-proxy", "localhost:8102"]).is_err());
                assert!(parse(&["test", "--dev-proxy", "http://localhost:8102"]).is_ok());
            },
        );
    }
}
