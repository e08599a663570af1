pub mod login;
pub mod logout;
pub mod request;
pub mod route;
pub mod shell;
pub mod status;

use serde::Serialize;

#[derive(Debug)]
pub enum Action {
    Login(login::Args),
    Logout,
    Status,
    Request(request::Args),
    Route { path: String },
    Shell,
}

/// Prints a value as pretty JSON on stdout.
///
/// # Errors
/// Returns an error if the value cannot be encoded.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
