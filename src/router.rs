//! Route table and navigation guard. The guard is UX only: it decides which
//! view to show from the local session state, while the server still enforces
//! access on every API call.

use crate::auth::SessionState;
use serde::Serialize;
use std::collections::BTreeMap;

pub const LOGIN_PATH: &str = "/login";
pub const LANDING_PATH: &str = "/dashboard";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteName {
    Login,
    Dashboard,
    Documents,
    Settings,
    Module,
    NotFound,
}

#[derive(Clone, Copy, Debug)]
pub struct RouteDef {
    pub pattern: &'static str,
    pub name: RouteName,
    /// `None` means the route did not say; such routes require auth.
    pub requires_auth: Option<bool>,
}

impl RouteDef {
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        self.requires_auth != Some(false)
    }
}

pub const ROUTES: &[RouteDef] = &[
    RouteDef {
        pattern: "/login",
        name: RouteName::Login,
        requires_auth: Some(false),
    },
    RouteDef {
        pattern: "/dashboard",
        name: RouteName::Dashboard,
        requires_auth: Some(true),
    },
    RouteDef {
        pattern: "/documents",
        name: RouteName::Documents,
        requires_auth: Some(true),
    },
    RouteDef {
        pattern: "/settings",
        name: RouteName::Settings,
        requires_auth: Some(true),
    },
    RouteDef {
        pattern: "/modules/:module",
        name: RouteName::Module,
        requires_auth: Some(true),
    },
];

const NOT_FOUND: RouteDef = RouteDef {
    pattern: "/:pathMatch(.*)*",
    name: RouteName::NotFound,
    requires_auth: None,
};

/// Old `/folder/:id` mailbox paths and where they live now.
const LEGACY_FOLDERS: &[(&str, &str)] = &[
    ("Inbox", "/dashboard"),
    ("Outbox", "/documents"),
    ("Favorites", "/documents"),
    ("Archived", "/documents"),
    ("Trash", "/documents"),
    ("Spam", "/documents"),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Navigation {
    View {
        route: RouteName,
        path: String,
        params: BTreeMap<String, String>,
    },
    Redirect {
        to: String,
    },
}

/// Guard decision for a matched route: `Some(path)` to redirect, `None` to allow.
#[must_use]
pub fn guard(route: &RouteDef, path: &str, is_authenticated: bool) -> Option<&'static str> {
    let requires_auth = route.requires_auth();
    if requires_auth && !is_authenticated {
        Some(LOGIN_PATH)
    } else if !requires_auth && is_authenticated && path == LOGIN_PATH {
        Some(LANDING_PATH)
    } else {
        None
    }
}

/// Rewrites paths that moved, before any guard runs.
#[must_use]
pub fn static_redirect(path: &str) -> Option<String> {
    if path.is_empty() || path == "/" {
        return Some(LANDING_PATH.to_string());
    }

    let id = path.strip_prefix("/folder/")?;
    if id.is_empty() || id.contains('/') {
        return None;
    }
    let target = LEGACY_FOLDERS
        .iter()
        .find(|(folder, _)| *folder == id)
        .map_or(LANDING_PATH, |(_, target)| *target);
    Some(target.to_string())
}

/// Finds the route for `path` and its `:param` captures. Falls back to the
/// not-found route.
#[must_use]
pub fn match_route(path: &str) -> (RouteDef, BTreeMap<String, String>) {
    for route in ROUTES {
        if let Some(params) = match_pattern(route.pattern, path) {
            return (*route, params);
        }
    }

    let mut params = BTreeMap::new();
    params.insert(
        "pathMatch".to_string(),
        path.trim_start_matches('/').to_string(),
    );
    (NOT_FOUND, params)
}

/// Resolves a navigation target against the current session state.
#[must_use]
pub fn resolve(target: &str, state: &SessionState) -> Navigation {
    let path = normalize_path(target);

    if let Some(to) = static_redirect(&path) {
        return Navigation::Redirect { to };
    }

    let (route, params) = match_route(&path);
    if let Some(to) = guard(&route, &path, state.is_authenticated) {
        return Navigation::Redirect { to: to.to_string() };
    }

    Navigation::View {
        route: route.name,
        path,
        params,
    }
}

/// Drops query string and fragment and a trailing slash.
fn normalize_path(target: &str) -> String {
    let path = target
        .trim()
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn match_pattern(pattern: &str, path: &str) -> Option<BTreeMap<String, String>> {
    let mut pattern_segments = pattern.split('/').filter(|s| !s.is_empty());
    let mut path_segments = path.split('/').filter(|s| !s.is_empty());
    let mut params = BTreeMap::new();

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return Some(params),
            (Some(expected), Some(actual)) => {
                if let Some(name) = expected.strip_prefix(':') {
                    params.insert(name.to_string(), actual.to_string());
                } else if expected != actual {
                    return None;
                }
            }
            _ => return None,
        }
    }
}
