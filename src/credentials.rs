//! Remembers the non-secret half of a login (server domain and username) so the
//! next run can prefill the login form and reconnect to the same server. The
//! password never reaches this module.

use crate::{auth::Credentials, storage::KeyValueStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key shared with earlier releases of the app.
pub const CREDENTIALS_KEY: &str = "innomate_credentials";

/// Stored shape; the JSON keys match what earlier releases wrote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCredential {
    #[serde(rename = "siteDomain")]
    site_domain: String,
    username: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedCredential {
    pub server_domain: String,
    pub username: String,
    pub remember_me: bool,
}

#[derive(Clone)]
pub struct CredentialCache {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialCache {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persists `{serverDomain, username}` when `remember_me` is set, otherwise
    /// forgets any previous entry. Storage failures are logged, not returned.
    pub fn save(&self, credentials: &Credentials) {
        if credentials.remember_me {
            let stored = StoredCredential {
                site_domain: credentials.server_domain.clone(),
                username: credentials.username.clone(),
            };
            let payload = match serde_json::to_string(&stored) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!("Failed to encode cached credential: {err}");
                    return;
                }
            };
            match self.store.set(CREDENTIALS_KEY, &payload) {
                Ok(()) => debug!("cached credential saved for {}", stored.username),
                Err(err) => warn!("Failed to save cached credential: {err}"),
            }
        } else {
            self.clear();
        }
    }

    /// Returns the cached credential, or `None` when nothing usable is stored.
    /// Unreadable storage and malformed entries both count as "nothing cached".
    #[must_use]
    pub fn load(&self) -> Option<CachedCredential> {
        let raw = match self.store.get(CREDENTIALS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("Failed to read cached credential: {err}");
                return None;
            }
        };

        match serde_json::from_str::<StoredCredential>(&raw) {
            Ok(stored) => Some(CachedCredential {
                server_domain: stored.site_domain,
                username: stored.username,
                remember_me: true,
            }),
            Err(err) => {
                warn!("Ignoring malformed cached credential: {err}");
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(err) = self.store.remove(CREDENTIALS_KEY) {
            warn!("Failed to clear cached credential: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, storage::MemoryStore};
    use anyhow::Result;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
            Err(AppError::Storage("unavailable".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), AppError> {
            Err(AppError::Storage("unavailable".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<(), AppError> {
            Err(AppError::Storage("unavailable".to_string()))
        }
    }

    fn credentials(remember_me: bool) -> Credentials {
        Credentials::new("https://demo.example.com", "admin", "s3cret", remember_me)
    }

    #[test]
    fn save_with_remember_me_writes_domain_and_username_only() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let cache = CredentialCache::new(store.clone());

        cache.save(&credentials(true));

        let raw = store.get(CREDENTIALS_KEY)?.unwrap_or_default();
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        assert_eq!(
            value,
            serde_json::json!({"siteDomain": "https://demo.example.com", "username": "admin"})
        );
        assert!(!raw.contains("s3cret"));
        Ok(())
    }

    #[test]
    fn save_without_remember_me_removes_entry() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let cache = CredentialCache::new(store.clone());

        cache.save(&credentials(true));
        cache.save(&credentials(false));

        assert_eq!(store.get(CREDENTIALS_KEY)?, None);
        assert_eq!(cache.load(), None);
        Ok(())
    }

    #[test]
    fn load_reports_remember_me() {
        let cache = CredentialCache::new(Arc::new(MemoryStore::new()));
        cache.save(&credentials(true));

        assert_eq!(
            cache.load(),
            Some(CachedCredential {
                server_domain: "https://demo.example.com".to_string(),
                username: "admin".to_string(),
                remember_me: true,
            })
        );
    }

    #[test]
    fn load_treats_malformed_json_as_absent() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        store.set(CREDENTIALS_KEY, "{not json")?;
        let cache = CredentialCache::new(store.clone());
        assert_eq!(cache.load(), None);

        store.set(CREDENTIALS_KEY, "{\"username\":\"admin\"}")?;
        assert_eq!(cache.load(), None);
        Ok(())
    }

    #[test]
    fn storage_failures_are_swallowed() {
        let cache = CredentialCache::new(Arc::new(BrokenStore));
        cache.save(&credentials(true));
        cache.save(&credentials(false));
        assert_eq!(cache.load(), None);
    }
}
