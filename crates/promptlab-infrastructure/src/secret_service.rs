//! Secret service implementation.
//!
//! Reads `secret.json` through [`SecretStorage`] and caches the result so
//! repeated lookups don't touch the file system.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use promptlab_core::config::{SecretConfig, SecretService};

use crate::storage::{SecretStorage, SecretStorageError};

#[derive(Clone)]
pub struct SecretServiceImpl {
    secrets: Arc<RwLock<Option<SecretConfig>>>,
    storage: Arc<SecretStorage>,
}

impl SecretServiceImpl {
    /// Service backed by the default secret file location.
    pub fn new() -> Result<Self, SecretStorageError> {
        Ok(Self::with_storage(SecretStorage::new()?))
    }

    /// Service backed by a secret file at `path`.
    pub fn with_path(path: PathBuf) -> Self {
        Self::with_storage(SecretStorage::with_path(path))
    }

    fn with_storage(storage: SecretStorage) -> Self {
        Self {
            secrets: Arc::new(RwLock::new(None)),
            storage: Arc::new(storage),
        }
    }

    fn load_secrets_internal(&self) -> Result<SecretConfig, String> {
        {
            let cached = self
                .secrets
                .read()
                .map_err(|_| "Secret cache lock poisoned".to_string())?;
            if let Some(ref secrets) = *cached {
                return Ok(secrets.clone());
            }
        }

        let loaded = self.storage.load().map_err(|e| e.to_string())?;

        let mut cache = self
            .secrets
            .write()
            .map_err(|_| "Secret cache lock poisoned".to_string())?;
        *cache = Some(loaded.clone());

        Ok(loaded)
    }
}

#[async_trait::async_trait]
impl SecretService for SecretServiceImpl {
    async fn load_secrets(&self) -> Result<SecretConfig, String> {
        self.load_secrets_internal()
    }

    async fn secret_file_exists(&self) -> bool {
        self.storage.exists()
    }
}
