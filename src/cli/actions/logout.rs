use crate::cli::{actions::print_json, globals::GlobalArgs};
use anyhow::Result;

/// Execute the logout action against the remembered (or given) server.
/// # Errors
/// Returns an error if storage or the HTTP client cannot be set up.
pub async fn execute(globals: &GlobalArgs) -> Result<()> {
    let auth = globals.manager()?;
    auth.load_saved_credentials();
    if let Some(server) = &globals.server {
        auth.set_server_domain(server);
    }

    auth.logout().await;
    print_json(&auth.state())
}
