//! Session state owned by the auth manager. Readers get cloned snapshots; only
//! the manager mutates it, and never while a request is in flight.

use crate::auth::types::User;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    Anonymous,
    Authenticating,
    Authenticated,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub is_authenticated: bool,
    pub user: Option<User>,
    pub server_domain: String,
    pub is_loading: bool,
}

impl SessionState {
    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        if self.is_loading {
            AuthPhase::Authenticating
        } else if self.is_authenticated {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Anonymous
        }
    }

    pub(crate) fn set_authenticated(&mut self, user: User) {
        self.user = Some(user);
        self.is_authenticated = true;
    }

    /// Drops the identity but keeps `server_domain` so the next login can
    /// target the same server.
    pub(crate) fn clear_session(&mut self) {
        self.is_authenticated = false;
        self.user = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_follows_flags() {
        let mut state = SessionState::default();
        assert_eq!(state.phase(), AuthPhase::Anonymous);

        state.is_loading = true;
        assert_eq!(state.phase(), AuthPhase::Authenticating);

        state.is_loading = false;
        state.set_authenticated(User::from_username("admin"));
        assert_eq!(state.phase(), AuthPhase::Authenticated);
        assert!(state.user.is_some());
    }

    #[test]
    fn clear_session_keeps_server_domain() {
        let mut state = SessionState {
            server_domain: "https://demo.example.com".to_string(),
            ..SessionState::default()
        };
        state.set_authenticated(User::from_username("admin"));
        state.clear_session();

        assert!(!state.is_authenticated);
        assert_eq!(state.user, None);
        assert_eq!(state.server_domain, "https://demo.example.com");
    }
}
