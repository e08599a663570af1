//! Interactive shell. One manager, and so one cookie jar, lives for the whole
//! loop, which is what makes `get`/`post` after `login` work.

use crate::{
    auth::{AuthSessionManager, Credentials, Outcome, RequestOptions},
    cli::{actions::print_json, globals::GlobalArgs},
    config::normalize_server_domain,
    router::{self, Navigation},
};
use anyhow::{Result, anyhow};
use secrecy::SecretString;
use serde_json::Value;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::debug;

const HELP: &str = "\
commands:
  login <username> [server] [--remember]   sign in (password is read next)
  logout                                   end the session
  status                                   show the session state
  whoami                                   show the signed-in user
  get <endpoint>                           GET an endpoint below /api
  post <endpoint> [json]                   POST to an endpoint below /api
  go <path>                                navigate to an app route
  help                                     show this help
  quit                                     leave the shell";

#[derive(Debug, PartialEq)]
pub enum ShellCommand {
    Empty,
    Login {
        username: String,
        server: Option<String>,
        remember: bool,
    },
    Logout,
    Status,
    WhoAmI,
    Get {
        endpoint: String,
    },
    Post {
        endpoint: String,
        body: Option<Value>,
    },
    Go {
        path: String,
    },
    Help,
    Quit,
}

/// Parses one shell line.
///
/// # Errors
/// Returns a usage message for unknown commands or missing arguments.
pub fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));

    match word {
        "" => Ok(ShellCommand::Empty),
        "login" => {
            let mut username = None;
            let mut server = None;
            let mut remember = false;
            for token in rest.split_whitespace() {
                if token == "--remember" {
                    remember = true;
                } else if username.is_none() {
                    username = Some(token.to_string());
                } else if server.is_none() {
                    server = Some(
                        normalize_server_domain(token)
                            .ok_or_else(|| format!("invalid server: {token}"))?,
                    );
                } else {
                    return Err(format!("unexpected argument: {token}"));
                }
            }
            let username = username.ok_or("usage: login <username> [server] [--remember]")?;
            Ok(ShellCommand::Login {
                username,
                server,
                remember,
            })
        }
        "logout" => Ok(ShellCommand::Logout),
        "status" => Ok(ShellCommand::Status),
        "whoami" => Ok(ShellCommand::WhoAmI),
        "get" if !rest.is_empty() => Ok(ShellCommand::Get {
            endpoint: rest.to_string(),
        }),
        "get" => Err("usage: get <endpoint>".to_string()),
        "post" if !rest.is_empty() => {
            let (endpoint, body) = rest
                .split_once(char::is_whitespace)
                .map_or((rest, ""), |(endpoint, body)| (endpoint, body.trim()));
            let body = if body.is_empty() {
                None
            } else {
                Some(serde_json::from_str(body).map_err(|err| format!("invalid JSON: {err}"))?)
            };
            Ok(ShellCommand::Post {
                endpoint: endpoint.to_string(),
                body,
            })
        }
        "post" => Err("usage: post <endpoint> [json]".to_string()),
        "go" if !rest.is_empty() => Ok(ShellCommand::Go {
            path: rest.to_string(),
        }),
        "go" => Err("usage: go <path>".to_string()),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        other => Err(format!("unknown command: {other} (try `help`)")),
    }
}

pub struct Shell<R> {
    auth: AuthSessionManager,
    lines: Lines<BufReader<R>>,
    location: String,
}

impl<R: AsyncRead + Unpin> Shell<R> {
    #[must_use]
    pub fn new(auth: AuthSessionManager, input: R) -> Self {
        Self {
            auth,
            lines: BufReader::new(input).lines(),
            location: String::new(),
        }
    }

    #[must_use]
    pub fn manager(&self) -> &AuthSessionManager {
        &self.auth
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Restores any remembered session, then reads commands until `quit` or EOF.
    ///
    /// # Errors
    /// Returns an error if input cannot be read.
    pub async fn run(&mut self, default_server: Option<&str>) -> Result<()> {
        let phase = self.auth.check_auth_status().await;
        if let Some(server) = default_server {
            if self.auth.state().server_domain.is_empty() {
                self.auth.set_server_domain(server);
            }
        }
        debug!("shell started: {phase:?}");
        self.navigate("/");

        loop {
            prompt(&self.location);
            let Some(line) = self.lines.next_line().await? else {
                break;
            };

            let command = match parse_line(&line) {
                Ok(command) => command,
                Err(usage) => {
                    eprintln!("{usage}");
                    continue;
                }
            };

            if command == ShellCommand::Quit {
                break;
            }
            if let Err(err) = self.handle(command).await {
                eprintln!("error: {err}");
            }
        }

        Ok(())
    }

    async fn handle(&mut self, command: ShellCommand) -> Result<()> {
        match command {
            ShellCommand::Empty | ShellCommand::Quit => {}
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Login {
                username,
                server,
                remember,
            } => {
                let server_domain = server
                    .or_else(|| Some(self.auth.state().server_domain))
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| anyhow!("no server known yet: login <username> <server>"))?;

                eprint!("Password: ");
                flush_stderr();
                let password = self
                    .lines
                    .next_line()
                    .await?
                    .ok_or_else(|| anyhow!("input closed before password"))?;

                let credentials = Credentials {
                    server_domain,
                    username,
                    password: SecretString::from(password),
                    remember_me: remember,
                };
                match self.auth.login(credentials).await {
                    Outcome::Success { .. } => {
                        if let Some(user) = self.auth.user() {
                            println!("signed in as {} ({})", user.full_name, user.email);
                        }
                        self.navigate(router::LANDING_PATH);
                    }
                    Outcome::Failure { error, .. } => return Err(anyhow!(error)),
                }
            }
            ShellCommand::Logout => {
                self.auth.logout().await;
                println!("signed out");
                let current = self.location.clone();
                self.navigate(&current);
            }
            ShellCommand::Status => print_json(&self.auth.state())?,
            ShellCommand::WhoAmI => match self.auth.user() {
                Some(user) => print_json(&user)?,
                None => println!("not signed in"),
            },
            ShellCommand::Get { endpoint } => {
                self.request(&endpoint, RequestOptions::default()).await?;
            }
            ShellCommand::Post { endpoint, body } => {
                self.request(&endpoint, RequestOptions::post(body)).await?;
            }
            ShellCommand::Go { path } => self.navigate(&path),
        }
        Ok(())
    }

    async fn request(&mut self, endpoint: &str, options: RequestOptions) -> Result<()> {
        match self.auth.make_authenticated_request(endpoint, options).await {
            Outcome::Success { data } => print_json(&data),
            Outcome::Failure {
                error,
                needs_auth: true,
            } => {
                self.navigate(router::LOGIN_PATH);
                Err(anyhow!("{error} (sign in again)"))
            }
            Outcome::Failure { error, .. } => Err(anyhow!(error)),
        }
    }

    fn navigate(&mut self, target: &str) {
        let state = self.auth.state();
        let mut target = target.to_string();
        // redirects settle within a couple of hops; the bound stops a bad table
        for _ in 0..4 {
            match router::resolve(&target, &state) {
                Navigation::Redirect { to } => {
                    debug!("redirect {target} -> {to}");
                    target = to;
                }
                Navigation::View { route, path, params } => {
                    if params.is_empty() {
                        println!("-> {path} [{route:?}]");
                    } else {
                        println!("-> {path} [{route:?}] {params:?}");
                    }
                    self.location = path;
                    return;
                }
            }
        }
        eprintln!("too many redirects for {target}");
    }
}

fn prompt(location: &str) {
    eprint!("innomate {location}> ");
    flush_stderr();
}

fn flush_stderr() {
    let _ = std::io::stderr().flush();
}

/// Execute the shell action on stdin.
/// # Errors
/// Returns an error if setup fails or stdin cannot be read.
pub async fn execute(globals: &GlobalArgs) -> Result<()> {
    let mut shell = Shell::new(globals.manager()?, tokio::io::stdin());
    shell.run(globals.server.as_deref()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ClientConfig, storage::MemoryStore};
    use serde_json::json;
    use std::{net::TcpListener, sync::Arc};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[test]
    fn parse_login_with_server_and_remember() {
        assert_eq!(
            parse_line("login admin erp.example.com --remember"),
            Ok(ShellCommand::Login {
                username: "admin".to_string(),
                server: Some("https://erp.example.com".to_string()),
                remember: true,
            })
        );
        assert!(parse_line("login").is_err());
        assert!(parse_line("login a b c").is_err());
    }

    #[test]
    fn parse_post_with_json_body() {
        assert_eq!(
            parse_line("post /resource/ToDo {\"description\": \"x\"}"),
            Ok(ShellCommand::Post {
                endpoint: "/resource/ToDo".to_string(),
                body: Some(json!({"description": "x"})),
            })
        );
        assert!(parse_line("post /resource/ToDo {bad").is_err());
    }

    #[test]
    fn parse_simple_commands() {
        assert_eq!(parse_line("   "), Ok(ShellCommand::Empty));
        assert_eq!(parse_line("exit"), Ok(ShellCommand::Quit));
        assert_eq!(
            parse_line("go /modules/stock"),
            Ok(ShellCommand::Go {
                path: "/modules/stock".to_string()
            })
        );
        assert!(parse_line("get").is_err());
        assert!(parse_line("frobnicate").is_err());
    }

    #[tokio::test]
    async fn shell_keeps_one_session_across_commands() -> anyhow::Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/method/login"))
            .and(body_json(json!({"usr": "admin", "pwd": "pw"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Set-Cookie", "sid=abc; Path=/")
                    .set_body_json(json!({"message": "Logged In"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/method/frappe.auth.get_logged_user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "admin"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/resource/Item"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/method/logout"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let auth = AuthSessionManager::from_config(
            ClientConfig::default(),
            Arc::new(MemoryStore::new()),
        )?;
        let script = format!(
            "login admin {}\npw\nwhoami\nget /resource/Item\ngo /modules/stock\nlogout\nquit\n",
            server.uri()
        );
        let mut shell = Shell::new(auth, script.as_bytes());
        shell.run(None).await?;

        let state = shell.manager().state();
        assert!(!state.is_authenticated);
        assert_eq!(state.server_domain, server.uri());
        // logged out while on a protected route
        assert_eq!(shell.location(), "/login");
        Ok(())
    }
}
