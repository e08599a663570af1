//! Cookie jar that outlives the process. The server's `sid` cookie is kept in
//! the same key/value store as the credential cache, so a later run can check
//! or end the session that an earlier run opened.

use crate::{error::AppError, storage::KeyValueStore};
use cookie_store::CookieStore;
use reqwest_cookie_store::CookieStoreMutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key for the serialized jar.
pub const COOKIES_KEY: &str = "innomate_cookies";

#[derive(Clone)]
pub struct SessionCookies {
    jar: Arc<CookieStoreMutex>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl std::fmt::Debug for SessionCookies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCookies")
            .field("persistent", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for SessionCookies {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SessionCookies {
    /// Jar that is dropped with the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            jar: Arc::new(CookieStoreMutex::new(CookieStore::default())),
            store: None,
        }
    }

    /// Loads the jar saved in `store`. A missing or unreadable entry starts an
    /// empty jar.
    #[must_use]
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let cookies = match store.get(COOKIES_KEY) {
            Ok(Some(raw)) => match cookie_store::serde::json::load_all(raw.as_bytes()) {
                Ok(cookies) => cookies,
                Err(err) => {
                    warn!("Ignoring unreadable cookie jar: {err}");
                    CookieStore::default()
                }
            },
            Ok(None) => CookieStore::default(),
            Err(err) => {
                warn!("Failed to read cookie jar: {err}");
                CookieStore::default()
            }
        };

        Self {
            jar: Arc::new(CookieStoreMutex::new(cookies)),
            store: Some(store),
        }
    }

    /// Shared handle for `reqwest::ClientBuilder::cookie_provider`.
    #[must_use]
    pub fn provider(&self) -> Arc<CookieStoreMutex> {
        Arc::clone(&self.jar)
    }

    /// Writes the jar back to storage. Session cookies are kept too: the
    /// process ending is not the end of the user's session.
    ///
    /// # Errors
    /// Returns an error if the jar cannot be encoded or stored.
    pub fn save(&self) -> Result<(), AppError> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        let mut buffer = Vec::new();
        {
            let jar = self
                .jar
                .lock()
                .map_err(|_| AppError::Storage("cookie jar lock poisoned".to_string()))?;
            cookie_store::serde::json::save_incl_expired_and_nonpersistent(&jar, &mut buffer)
                .map_err(|err| AppError::Storage(format!("Failed to encode cookies: {err}")))?;
        }
        let payload = String::from_utf8(buffer)
            .map_err(|err| AppError::Storage(format!("Failed to encode cookies: {err}")))?;

        store.set(COOKIES_KEY, &payload)?;
        debug!("cookie jar saved");
        Ok(())
    }

    /// Like [`Self::save`], logging instead of returning the error.
    pub fn persist(&self) {
        if let Err(err) = self.save() {
            warn!("Failed to save cookie jar: {err}");
        }
    }

    /// Drops every cookie, in memory and in storage.
    pub fn clear(&self) {
        match self.jar.lock() {
            Ok(mut jar) => jar.clear(),
            Err(_) => warn!("cookie jar lock poisoned"),
        }
        if let Some(store) = &self.store {
            if let Err(err) = store.remove(COOKIES_KEY) {
                warn!("Failed to remove cookie jar: {err}");
            }
        }
    }

    /// Number of cookies currently held, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jar
            .lock()
            .map(|jar| jar.iter_any().count())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use anyhow::Result;
    use url::Url;

    fn store_cookie(cookies: &SessionCookies, header: &str, url: &str) -> Result<()> {
        let url = Url::parse(url)?;
        let mut jar = cookies
            .jar
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?;
        jar.parse(header, &url)
            .map_err(|err| anyhow::anyhow!("{err}"))?;
        Ok(())
    }

    #[test]
    fn session_cookie_survives_reload() -> Result<()> {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let first = SessionCookies::load(Arc::clone(&store));
        store_cookie(&first, "sid=abc; Path=/", "http://127.0.0.1:8000/api/method/login")?;
        first.save()?;

        let second = SessionCookies::load(store);
        assert_eq!(second.len(), 1);
        Ok(())
    }

    #[test]
    fn clear_removes_stored_jar() -> Result<()> {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cookies = SessionCookies::load(Arc::clone(&store));
        store_cookie(&cookies, "sid=abc; Path=/", "https://erp.example.com/")?;
        cookies.save()?;
        assert!(store.get(COOKIES_KEY)?.is_some());

        cookies.clear();
        assert!(cookies.is_empty());
        assert_eq!(store.get(COOKIES_KEY)?, None);
        Ok(())
    }

    #[test]
    fn garbage_in_storage_starts_empty() -> Result<()> {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(COOKIES_KEY, "not json")?;
        assert!(SessionCookies::load(store).is_empty());
        Ok(())
    }

    #[test]
    fn in_memory_jar_saves_nowhere() -> Result<()> {
        let cookies = SessionCookies::in_memory();
        store_cookie(&cookies, "sid=abc; Path=/", "https://erp.example.com/")?;
        cookies.save()?;
        assert_eq!(cookies.len(), 1);
        Ok(())
    }
}
