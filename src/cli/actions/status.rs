use crate::cli::{actions::print_json, globals::GlobalArgs};
use anyhow::Result;
use serde_json::json;

/// Execute the status action.
/// # Errors
/// Returns an error if storage or the HTTP client cannot be set up.
pub async fn execute(globals: &GlobalArgs) -> Result<()> {
    let auth = globals.manager()?;
    let phase = auth.check_auth_status().await;
    print_json(&json!({ "phase": phase, "session": auth.state() }))
}
