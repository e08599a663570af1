pub mod connection;
pub mod logging;
pub mod storage;

use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const CMD_LOGIN: &str = "login";
pub const CMD_LOGOUT: &str = "logout";
pub const CMD_STATUS: &str = "status";
pub const CMD_REQUEST: &str = "request";
pub const CMD_ROUTE: &str = "route";
pub const CMD_SHELL: &str = "shell";

pub const ARG_USERNAME: &str = "username";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_REMEMBER: &str = "remember";
pub const ARG_FORGET: &str = "forget";
pub const ARG_ENDPOINT: &str = "endpoint";
pub const ARG_METHOD: &str = "method";
pub const ARG_DATA: &str = "data";
pub const ARG_PATH: &str = "path";

fn username_arg() -> Arg {
    Arg::new(ARG_USERNAME)
        .short('u')
        .long(ARG_USERNAME)
        .help("ERPNext user name or email (defaults to the remembered user)")
        .env("INNOMATE_USERNAME")
}

fn password_arg() -> Arg {
    Arg::new(ARG_PASSWORD)
        .long(ARG_PASSWORD)
        .help("Password; read from stdin when omitted")
        .env("INNOMATE_PASSWORD")
        .hide_env_values(true)
}

fn remember_arg() -> Arg {
    Arg::new(ARG_REMEMBER)
        .long(ARG_REMEMBER)
        .help("Remember the server and user name for the next run")
        .action(ArgAction::SetTrue)
}

fn forget_arg() -> Arg {
    Arg::new(ARG_FORGET)
        .long(ARG_FORGET)
        .help("Drop the remembered server and user name if sign in fails")
        .action(ArgAction::SetTrue)
        .conflicts_with(ARG_REMEMBER)
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("innomate")
        .about("ERPNext session client")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CMD_LOGIN)
                .about("Sign in and print the user")
                .arg(username_arg())
                .arg(password_arg())
                .arg(remember_arg())
                .arg(forget_arg()),
        )
        .subcommand(
            Command::new(CMD_LOGOUT).about("End the session on the remembered server"),
        )
        .subcommand(
            Command::new(CMD_STATUS).about("Check whether the remembered session is still valid"),
        )
        .subcommand(
            Command::new(CMD_REQUEST)
                .about("Sign in, then call an API endpoint and print the JSON result")
                .arg(
                    Arg::new(ARG_ENDPOINT)
                        .help("Endpoint below /api, example: /resource/Item")
                        .required(true),
                )
                .arg(
                    Arg::new(ARG_METHOD)
                        .short('X')
                        .long(ARG_METHOD)
                        .help("HTTP method")
                        .default_value("GET")
                        .value_parser(["GET", "POST", "PUT", "DELETE"]),
                )
                .arg(
                    Arg::new(ARG_DATA)
                        .short('d')
                        .long(ARG_DATA)
                        .help("JSON request body"),
                )
                .arg(username_arg())
                .arg(password_arg())
                .arg(remember_arg())
                .arg(forget_arg()),
        )
        .subcommand(
            Command::new(CMD_ROUTE)
                .about("Resolve an app route against the current session")
                .arg(
                    Arg::new(ARG_PATH)
                        .help("Route path, example: /modules/stock")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new(CMD_SHELL).about("Interactive shell sharing one session across commands"),
        );

    let command = connection::with_args(command);
    let command = storage::with_args(command);
    logging::with_args(command)
}
