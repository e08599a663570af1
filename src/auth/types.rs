//! Request and response types for the Frappe auth endpoints. `LoginRequest`
//! carries the password and must never be logged.

use crate::error::AppError;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Literal `message` the server returns on a successful login.
pub const LOGGED_IN: &str = "Logged In";
/// Identity the server reports when no user is signed in.
pub const GUEST: &str = "Guest";

/// What a user typed into the login form.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub server_domain: String,
    pub username: String,
    pub password: SecretString,
    pub remember_me: bool,
}

impl Credentials {
    #[must_use]
    pub fn new(server_domain: &str, username: &str, password: &str, remember_me: bool) -> Self {
        Self {
            server_domain: server_domain.to_string(),
            username: username.to_string(),
            password: SecretString::from(password.to_string()),
            remember_me,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    pub full_name: String,
}

impl User {
    /// Placeholder identity used when the server does not describe the user.
    #[must_use]
    pub fn from_username(username: &str) -> Self {
        Self {
            username: username.to_string(),
            email: username.to_string(),
            full_name: username.to_string(),
        }
    }
}

/// `message` payload of the identity endpoint: either a profile object or a
/// bare user name (which may be the `Guest` sentinel).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Identity {
    Profile(User),
    Name(String),
}

impl Identity {
    /// Converts to a `User`, or `None` for `Guest` and empty names.
    #[must_use]
    pub fn into_user(self) -> Option<User> {
        match self {
            Identity::Profile(user) if user.username != GUEST && !user.username.is_empty() => {
                Some(user)
            }
            Identity::Profile(_) => None,
            Identity::Name(name) if name != GUEST && !name.trim().is_empty() => {
                Some(User::from_username(name.trim()))
            }
            Identity::Name(_) => None,
        }
    }
}

/// Frappe wraps method results in `{"message": ...}`.
#[derive(Clone, Debug, Deserialize)]
pub struct MethodResponse<T> {
    pub message: Option<T>,
}

pub(crate) struct LoginRequest<'a> {
    pub usr: &'a str,
    pub pwd: &'a SecretString,
}

impl Serialize for LoginRequest<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("LoginRequest", 2)?;
        state.serialize_field("usr", self.usr)?;
        state.serialize_field("pwd", self.pwd.expose_secret())?;
        state.end()
    }
}

/// Options for [`super::AuthSessionManager::make_authenticated_request`].
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: Vec::new(),
        }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn post(body: Option<Value>) -> Self {
        Self {
            method: Method::POST,
            body,
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Result handed to UI code; failures are plain strings, never errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Success { data: T },
    Failure { error: String, needs_auth: bool },
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    #[must_use]
    pub fn needs_auth(&self) -> bool {
        matches!(self, Outcome::Failure { needs_auth: true, .. })
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { error, .. } => Some(error),
        }
    }

    #[must_use]
    pub fn data(self) -> Option<T> {
        match self {
            Outcome::Success { data } => Some(data),
            Outcome::Failure { .. } => None,
        }
    }
}

impl<T> From<Result<T, AppError>> for Outcome<T> {
    fn from(result: Result<T, AppError>) -> Self {
        match result {
            Ok(data) => Outcome::Success { data },
            Err(err) => Outcome::Failure {
                needs_auth: err.needs_auth(),
                error: err.to_string(),
            },
        }
    }
}
