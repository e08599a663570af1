use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_STORAGE_PATH: &str = "storage-path";
pub const ARG_EPHEMERAL: &str = "ephemeral";

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub path: Option<PathBuf>,
    pub ephemeral: bool,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            path: matches
                .get_one::<String>(ARG_STORAGE_PATH)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            ephemeral: matches.get_flag(ARG_EPHEMERAL),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_STORAGE_PATH)
                .long(ARG_STORAGE_PATH)
                .help("Path of the JSON file holding remembered logins")
                .env("INNOMATE_STORAGE_PATH")
                .global(true),
        )
        .arg(
            Arg::new(ARG_EPHEMERAL)
                .long(ARG_EPHEMERAL)
                .help("Keep remembered logins in memory only (overrides --storage-path)")
                .global(true)
                .action(ArgAction::SetTrue),
        )
}
