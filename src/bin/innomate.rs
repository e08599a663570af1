use anyhow::Result;
use innomate::cli::{actions, actions::Action, start};

#[tokio::main]
async fn main() -> Result<()> {
    let (action, globals) = start()?;

    match action {
        Action::Login(args) => actions::login::execute(args, &globals).await?,
        Action::Logout => actions::logout::execute(&globals).await?,
        Action::Status => actions::status::execute(&globals).await?,
        Action::Request(args) => actions::request::execute(args, &globals).await?,
        Action::Route { path } => actions::route::execute(&path, &globals).await?,
        Action::Shell => actions::shell::execute(&globals).await?,
    }

    Ok(())
}
