//! Auth session manager for a Frappe/ERPNext server. It owns the session state,
//! drives login/logout/session checks over the cookie-aware client, and keeps
//! the credential cache in step with the user's "remember me" choice.
//!
//! Flow Overview: login records the server domain, posts `{usr, pwd}`, accepts
//! only `message == "Logged In"`, then asks the server who is logged in. That
//! second call is best effort; on failure the user is synthesized from the
//! submitted name. The cookie jar is saved to the same store as the credential
//! cache after every call, so startup checks in a later run reuse the session.
//! They only run when a cached credential exists. Logout clears local state and
//! the jar even if the server is gone.

pub mod state;
pub mod types;


pub use state::{AuthPhase, SessionState};
pub use types::{Credentials, Identity, Outcome, RequestOptions, User};

use crate::{
    client::{SessionClient, read_json, status_text},
    config::ClientConfig,
    cookies::SessionCookies,
    credentials::{CachedCredential, CredentialCache},
    error::AppError,
    storage::KeyValueStore,
};
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use types::{GUEST, LOGGED_IN, LoginRequest, MethodResponse};

pub const LOGIN_ENDPOINT: &str = "/method/login";
pub const LOGOUT_ENDPOINT: &str = "/method/logout";
pub const IDENTITY_ENDPOINT: &str = "/method/frappe.auth.get_logged_user";

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const AUTHENTICATION_REQUIRED: &str = "Authentication required";

pub struct AuthSessionManager {
    client: SessionClient,
    cache: CredentialCache,
    state: RwLock<SessionState>,
    // one login at a time; a second caller waits for the first to settle
    login_gate: Mutex<()>,
}

impl AuthSessionManager {
    #[must_use]
    pub fn new(client: SessionClient, cache: CredentialCache) -> Self {
        Self {
            client,
            cache,
            state: RwLock::new(SessionState::default()),
            login_gate: Mutex::new(()),
        }
    }

    /// Builds a manager from configuration and a storage backend. Both the
    /// credential cache and the cookie jar live in `store`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, AppError> {
        let cookies = SessionCookies::load(Arc::clone(&store));
        Ok(Self::new(
            SessionClient::with_cookies(config, cookies)?,
            CredentialCache::new(store),
        ))
    }

    /// Snapshot of the current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    /// Loads the cached credential and points the session at its server, so
    /// a login form can be prefilled.
    pub fn load_saved_credentials(&self) -> Option<CachedCredential> {
        let saved = self.cache.load()?;
        self.state.write().server_domain.clone_from(&saved.server_domain);
        Some(saved)
    }

    /// Points the session at a server without signing in, e.g. from a
    /// command-line flag. Ignored while a login is running.
    pub fn set_server_domain(&self, server_domain: &str) {
        let mut state = self.state.write();
        if !state.is_loading {
            state.server_domain = server_domain.to_string();
        }
    }

    /// Signs in and reports the result as an [`Outcome`]; no error escapes.
    /// The password is dropped when this returns.
    #[instrument(skip_all, fields(server = %credentials.server_domain, username = %credentials.username))]
    pub async fn login(&self, credentials: Credentials) -> Outcome<()> {
        let _gate = self.login_gate.lock().await;
        let _loading = LoadingGuard::start(&self.state);

        // recorded before the attempt so a retry targets the corrected server
        self.state
            .write()
            .server_domain
            .clone_from(&credentials.server_domain);

        let result = self.authenticate(&credentials).await;
        self.client.cookies().persist();

        match result {
            Ok(user) => {
                info!("Logged in as {}", user.username);
                self.state.write().set_authenticated(user);
                self.cache.save(&credentials);
                Outcome::Success { data: () }
            }
            Err(err) => {
                error!("Login error: {err}");
                self.state.write().clear_session();
                if !credentials.remember_me {
                    self.cache.clear();
                }
                Outcome::from(Err::<(), AppError>(err))
            }
        }
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<User, AppError> {
        let url = self
            .client
            .build_url(&credentials.server_domain, LOGIN_ENDPOINT)?;
        info!("Attempting login to: {url}");

        let request = LoginRequest {
            usr: &credentials.username,
            pwd: &credentials.password,
        };
        let response = self.client.post_json(&url, &request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Http {
                status: status.as_u16(),
                message: format!("Login failed: {} - {}", status.as_u16(), status_text(status)),
            });
        }

        let body: MethodResponse<Value> = read_json(response).await?;
        let message = body.message.as_ref().and_then(Value::as_str).unwrap_or("");
        if message != LOGGED_IN {
            let reason = if message.trim().is_empty() {
                INVALID_CREDENTIALS
            } else {
                message
            };
            return Err(AppError::Auth(reason.to_string()));
        }

        Ok(self.identity_or_fallback(&credentials.username).await)
    }

    async fn identity_or_fallback(&self, username: &str) -> User {
        match self.fetch_identity().await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!("Server reported no identity, using fallback");
                User::from_username(username)
            }
            Err(err) => {
                warn!("Could not fetch user info, using fallback: {err}");
                User::from_username(username)
            }
        }
    }

    async fn fetch_identity(&self) -> Result<Option<User>, AppError> {
        let server_domain = self.state.read().server_domain.clone();
        let url = self.client.build_url(&server_domain, IDENTITY_ENDPOINT)?;
        let body: MethodResponse<Identity> = read_json(self.client.get(&url).await?).await?;
        Ok(body.message.and_then(Identity::into_user))
    }

    /// Calls any endpoint with the session cookie. 401/403 come back as a
    /// failure with `needs_auth` set so callers can send the user to login.
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn make_authenticated_request(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Outcome<Value> {
        let result = self.authenticated_request(endpoint, options).await;
        self.client.cookies().persist();
        if let Err(err) = &result {
            error!("Authenticated request failed: {err}");
        }
        result.into()
    }

    async fn authenticated_request(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Value, AppError> {
        let server_domain = self.state.read().server_domain.clone();
        let url = self.client.build_url(&server_domain, endpoint)?;
        debug!("Making authenticated request to: {url}");

        let response = self
            .client
            .send(options.method, &url, options.body.as_ref(), &options.headers)
            .await?;

        match response.status() {
            StatusCode::FORBIDDEN => Err(AppError::SessionExpired {
                message: AUTHENTICATION_REQUIRED.to_string(),
            }),
            StatusCode::UNAUTHORIZED => Err(AppError::SessionExpired {
                message: INVALID_CREDENTIALS.to_string(),
            }),
            status if !status.is_success() => Err(AppError::Http {
                status: status.as_u16(),
                message: format!("HTTP {}: {}", status.as_u16(), status_text(status)),
            }),
            _ => read_json(response).await,
        }
    }

    /// Ends the session. Local state is cleared before the best-effort server
    /// call and the cookie jar right after it; `server_domain` and the
    /// credential cache are kept.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let server_domain = {
            let mut state = self.state.write();
            state.clear_session();
            state.server_domain.clone()
        };

        if server_domain.is_empty() {
            self.client.cookies().clear();
            return;
        }

        if let Err(err) = self.post_logout(&server_domain).await {
            warn!("Logout error: {err}");
        } else {
            info!("Logged out");
        }
        self.client.cookies().clear();
    }

    async fn post_logout(&self, server_domain: &str) -> Result<(), AppError> {
        let url = self.client.build_url(server_domain, LOGOUT_ENDPOINT)?;
        let response = self.client.post_empty(&url).await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AppError::Http {
                status: status.as_u16(),
                message: format!("HTTP {}: {}", status.as_u16(), status_text(status)),
            })
        }
    }

    /// Restores a session at startup. Without a cached credential nothing is
    /// sent and the state stays anonymous. Safe to call repeatedly.
    #[instrument(skip(self))]
    pub async fn check_auth_status(&self) -> AuthPhase {
        let Some(saved) = self.load_saved_credentials() else {
            debug!("No cached credential, skipping session check");
            return self.state.read().phase();
        };
        if saved.server_domain.trim().is_empty() {
            return self.state.read().phase();
        }

        match self
            .make_authenticated_request(IDENTITY_ENDPOINT, RequestOptions::default())
            .await
        {
            Outcome::Success { data } => {
                let user = serde_json::from_value::<MethodResponse<Identity>>(data)
                    .ok()
                    .and_then(|body| body.message)
                    .and_then(Identity::into_user);
                let mut state = self.state.write();
                if let Some(user) = user {
                    debug!("Session restored for {}", user.username);
                    state.set_authenticated(user);
                } else {
                    debug!("Server reports {GUEST}, session is gone");
                    state.clear_session();
                }
            }
            Outcome::Failure {
                needs_auth: true, ..
            } => {
                self.state.write().clear_session();
            }
            Outcome::Failure { error, .. } => {
                warn!("Auth check failed: {error}");
            }
        }

        self.state.read().phase()
    }
}

/// Holds `is_loading` for the lifetime of a login, including early returns
/// and a dropped future.
struct LoadingGuard<'a> {
    state: &'a RwLock<SessionState>,
}

impl<'a> LoadingGuard<'a> {
    fn start(state: &'a RwLock<SessionState>) -> Self {
        state.write().is_loading = true;
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.write().is_loading = false;
    }
}
