//! Client configuration: where API calls go and how the transport behaves.
//! In development the client talks to a local reverse proxy that forwards
//! `/api` to the real server; in production it prefixes every endpoint with the
//! server domain the user logged in to. Configuration values are public; do not
//! store secrets here.

use std::time::Duration;

/// Default local proxy used in development mode.
pub const DEFAULT_DEV_PROXY: &str = "http://localhost:8102";

/// Prefix every endpoint lives under on a Frappe server.
pub const API_PREFIX: &str = "/api";

/// Selects how endpoint URLs are built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiMode {
    /// Route through a local proxy base, ignoring the server domain.
    Development { proxy_base: String },
    /// Prefix with the server domain held in the session state.
    Production,
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub mode: ApiMode,
    pub user_agent: String,
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mode: ApiMode::Production,
            user_agent: crate::APP_USER_AGENT.to_string(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn development(proxy_base: &str) -> Self {
        let proxy_base =
            normalize_value(proxy_base).unwrap_or_else(|| DEFAULT_DEV_PROXY.to_string());
        Self {
            mode: ApiMode::Development { proxy_base },
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Trims a user-supplied value and rejects empty input.
#[must_use]
pub fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Normalizes a server domain typed by a user: trims whitespace and trailing
/// slashes, and assumes `https://` when no scheme is given.
#[must_use]
pub fn normalize_server_domain(value: &str) -> Option<String> {
    let trimmed = normalize_value(value)?;
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{trimmed}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_value_trims_and_rejects_empty() {
        assert_eq!(normalize_value(""), None);
        assert_eq!(normalize_value("   "), None);
        assert_eq!(
            normalize_value("  https://demo.example.com "),
            Some("https://demo.example.com".to_string())
        );
    }

    #[test]
    fn normalize_server_domain_adds_scheme_and_strips_slash() {
        assert_eq!(
            normalize_server_domain("demo.example.com/"),
            Some("https://demo.example.com".to_string())
        );
        assert_eq!(
            normalize_server_domain("http://10.0.0.5:8000"),
            Some("http://10.0.0.5:8000".to_string())
        );
        assert_eq!(normalize_server_domain(" / "), None);
    }

    #[test]
    fn development_falls_back_to_default_proxy() {
        let config = ClientConfig::development("  ");
        assert_eq!(
            config.mode,
            ApiMode::Development {
                proxy_base: DEFAULT_DEV_PROXY.to_string()
            }
        );
        assert!(config.timeout.is_none());
    }
}
