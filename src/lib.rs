//! # Innomate (ERP session client)
//!
//! `innomate` signs a user into a Frappe/ERPNext server and keeps that session
//! usable for later API calls. The server-issued session cookie lives in the
//! HTTP transport's cookie store, which is saved between runs; this crate never
//! reads or replays it by hand.
//!
//! ## Components
//!
//! - [`storage`]: key/value storage capability (file-backed or in-memory).
//! - [`credentials`]: remembers `{serverDomain, username}` between runs. The
//!   password is never written anywhere.
//! - [`cookies`]: the session cookie jar, saved next to the credential cache so
//!   one run can pick up the session another run opened.
//! - [`client`]: JSON request helpers bound to the server domain or a local
//!   development proxy.
//! - [`auth`]: the session manager (`login`, `logout`, `check_auth_status`,
//!   `make_authenticated_request`) and the session state it owns.
//! - [`router`]: the route table, legacy redirects and the navigation guard.
//!
//! ## Session Flow
//!
//! 1. **Login:** `POST /api/method/login` with `{usr, pwd}`. Only a body whose
//!    `message` is `"Logged In"` counts as success.
//! 2. **Identity:** `GET /api/method/frappe.auth.get_logged_user`. A failure here
//!    never fails the login; the user is synthesized from the submitted name.
//! 3. **Startup check:** with a cached credential, the identity call decides
//!    whether the cookie jar still holds a valid session.
//! 4. **Logout:** best-effort `POST /api/method/logout`; local state always clears.
//!
//! Callers must never log [`auth::Credentials`]; the password is a
//! [`secrecy::SecretString`] for that reason.

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod cookies;
pub mod credentials;
pub mod error;
pub mod router;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

pub use auth::{AuthSessionManager, Credentials, Outcome, RequestOptions, SessionState, User};
pub use error::AppError;
