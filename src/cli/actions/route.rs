use crate::{
    cli::{actions::print_json, globals::GlobalArgs},
    router,
};
use anyhow::Result;

/// Execute the route action: restore the session, then resolve `path`.
/// # Errors
/// Returns an error if storage or the HTTP client cannot be set up.
pub async fn execute(path: &str, globals: &GlobalArgs) -> Result<()> {
    let auth = globals.manager()?;
    auth.check_auth_status().await;
    print_json(&router::resolve(path, &auth.state()))
}
