use crate::{
    auth::{Outcome, RequestOptions},
    cli::{actions::login, actions::print_json, globals::GlobalArgs},
};
use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::Value;

#[derive(Debug)]
pub struct Args {
    pub endpoint: String,
    pub method: Method,
    pub data: Option<Value>,
    pub login: login::Args,
}

/// Execute the request action. The session only lives for this process, so
/// the command signs in first.
/// # Errors
/// Returns an error if the login or the request fails.
pub async fn execute(args: Args, globals: &GlobalArgs) -> Result<()> {
    let auth = globals.manager()?;
    login::sign_in(&auth, args.login, globals).await?;

    let options = RequestOptions {
        method: args.method,
        body: args.data,
        headers: Vec::new(),
    };

    match auth.make_authenticated_request(&args.endpoint, options).await {
        Outcome::Success { data } => print_json(&data),
        Outcome::Failure {
            error,
            needs_auth: true,
        } => Err(anyhow!("{error} (sign in again)")),
        Outcome::Failure { error, .. } => Err(anyhow!(error)),
    }
}
