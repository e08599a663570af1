use crate::cli::{
    actions::{Action, login, request},
    commands::{self, connection, storage},
    globals::GlobalArgs,
};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use reqwest::Method;
use secrecy::SecretString;
use serde_json::Value;

/// Turns parsed arguments into the action to run and the options shared by all
/// actions.
///
/// # Errors
/// Returns an error for invalid flag values or an unknown subcommand.
pub fn handler(matches: &ArgMatches) -> Result<(Action, GlobalArgs)> {
    let connection = connection::Options::parse(matches)?;
    let storage = storage::Options::parse(matches);
    let globals = GlobalArgs {
        server: connection.server,
        dev_proxy: connection.dev_proxy,
        timeout: connection.timeout,
        storage_path: storage.path,
        ephemeral: storage.ephemeral,
    };

    let action = match matches.subcommand() {
        Some((commands::CMD_LOGIN, sub_m)) => Action::Login(login_args(sub_m)),
        Some((commands::CMD_LOGOUT, _)) => Action::Logout,
        Some((commands::CMD_STATUS, _)) => Action::Status,
        Some((commands::CMD_REQUEST, sub_m)) => Action::Request(request_args(sub_m)?),
        Some((commands::CMD_ROUTE, sub_m)) => Action::Route {
            path: sub_m
                .get_one::<String>(commands::ARG_PATH)
                .cloned()
                .context("missing required argument: path")?,
        },
        Some((commands::CMD_SHELL, _)) => Action::Shell,
        Some((other, _)) => return Err(anyhow!("unknown command: {other}")),
        None => return Err(anyhow!("no command given, try --help")),
    };

    Ok((action, globals))
}

fn login_args(matches: &ArgMatches) -> login::Args {
    let remember = if matches.get_flag(commands::ARG_REMEMBER) {
        Some(true)
    } else if matches.get_flag(commands::ARG_FORGET) {
        Some(false)
    } else {
        None
    };

    login::Args {
        username: matches.get_one::<String>(commands::ARG_USERNAME).cloned(),
        password: matches
            .get_one::<String>(commands::ARG_PASSWORD)
            .map(|p| SecretString::from(p.clone())),
        remember,
    }
}

fn request_args(matches: &ArgMatches) -> Result<request::Args> {
    let endpoint = matches
        .get_one::<String>(commands::ARG_ENDPOINT)
        .cloned()
        .context("missing required argument: endpoint")?;

    let method = matches
        .get_one::<String>(commands::ARG_METHOD)
        .map_or(Ok(Method::GET), |m| Method::from_bytes(m.as_bytes()))
        .context("invalid HTTP method")?;

    let data = matches
        .get_one::<String>(commands::ARG_DATA)
        .map(|raw| serde_json::from_str::<Value>(raw))
        .transpose()
        .context("--data is not valid JSON")?;

    Ok(request::Args {
        endpoint,
        method,
        data,
        login: login_args(matches),
    })
}
