use crate::{
    auth::{AuthSessionManager, Credentials, Outcome},
    cli::{actions::print_json, globals::GlobalArgs},
};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

#[derive(Debug, Default)]
pub struct Args {
    pub username: Option<String>,
    pub password: Option<SecretString>,
    /// `None` keeps the previous choice: remembered logins stay remembered.
    pub remember: Option<bool>,
}

/// Execute the login action.
/// # Errors
/// Returns an error if the server rejects the login or cannot be reached.
pub async fn execute(args: Args, globals: &GlobalArgs) -> Result<()> {
    let auth = globals.manager()?;
    sign_in(&auth, args, globals).await?;
    print_json(&auth.state())
}

/// Fills missing fields from flags, the remembered login and stdin, then logs in.
/// # Errors
/// Returns an error if a required field is missing or the login fails.
pub async fn sign_in(auth: &AuthSessionManager, args: Args, globals: &GlobalArgs) -> Result<()> {
    let saved = auth.load_saved_credentials();

    let server_domain = globals
        .server
        .clone()
        .or_else(|| saved.as_ref().map(|s| s.server_domain.clone()))
        .or_else(|| globals.dev_proxy.clone())
        .context("missing required argument: --server")?;

    let username = args
        .username
        .filter(|u| !u.trim().is_empty())
        .or_else(|| saved.as_ref().map(|s| s.username.clone()))
        .context("missing required argument: --username")?;

    let password = match args.password {
        Some(password) => password,
        None => read_password().await?,
    };

    let remember_me = args
        .remember
        .unwrap_or_else(|| saved.as_ref().is_some_and(|s| s.remember_me));
    debug!("remember me: {remember_me}");

    let credentials = Credentials {
        server_domain,
        username: username.trim().to_string(),
        password,
        remember_me,
    };

    match auth.login(credentials).await {
        Outcome::Success { .. } => Ok(()),
        Outcome::Failure { error, .. } => Err(anyhow!(error)),
    }
}

async fn read_password() -> Result<SecretString> {
    eprint!("Password: ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(anyhow!("missing required argument: --password"));
    }
    Ok(SecretString::from(password))
}
