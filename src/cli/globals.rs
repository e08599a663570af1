use crate::{
    auth::AuthSessionManager,
    config::ClientConfig,
    storage::{FileStore, KeyValueStore, MemoryStore},
};
use anyhow::Result;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::debug;

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub server: Option<String>,
    pub dev_proxy: Option<String>,
    pub timeout: Option<Duration>,
    pub storage_path: Option<PathBuf>,
    pub ephemeral: bool,
}

impl GlobalArgs {
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let config = match &self.dev_proxy {
            Some(proxy) => ClientConfig::development(proxy),
            None => ClientConfig::default(),
        };
        config.with_timeout(self.timeout)
    }

    /// # Errors
    /// Returns an error if no storage location can be determined.
    pub fn store(&self) -> Result<Arc<dyn KeyValueStore>> {
        if self.ephemeral {
            return Ok(Arc::new(MemoryStore::new()));
        }
        let path = match &self.storage_path {
            Some(path) => path.clone(),
            None => FileStore::default_path()?,
        };
        debug!("storage path: {}", path.display());
        Ok(Arc::new(FileStore::new(path)))
    }

    /// # Errors
    /// Returns an error if the storage location or HTTP client cannot be set up.
    pub fn manager(&self) -> Result<AuthSessionManager> {
        Ok(AuthSessionManager::from_config(
            self.client_config(),
            self.store()?,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiMode;

    #[test]
    fn test_global_args_default_is_production() {
        let args = GlobalArgs::default();
        let config = args.client_config();
        assert_eq!(config.mode, ApiMode::Production);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_dev_proxy_switches_mode() {
        let args = GlobalArgs {
            dev_proxy: Some("http://localhost:9000".to_string()),
            timeout: Some(Duration::from_secs(5)),
            ..GlobalArgs::default()
        };
        let config = args.client_config();
        assert_eq!(
            config.mode,
            ApiMode::Development {
                proxy_base: "http://localhost:9000".to_string()
            }
        );
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_ephemeral_store_ignores_path() -> Result<()> {
        let args = GlobalArgs {
            storage_path: Some(PathBuf::from("/nonexistent/dir/storage.json")),
            ephemeral: true,
            ..GlobalArgs::default()
        };
        let store = args.store()?;
        store.set("k", "v")?;
        assert_eq!(store.get("k")?, Some("v".to_string()));
        Ok(())
    }
}
