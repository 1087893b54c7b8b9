//! `secret.json` storage.
//!
//! Read-only: the template is written by [`PromptLabPaths::ensure_secret_file`]
//! and edited by hand afterwards. Error messages carry the file path but never
//! its contents.

use std::fs;
use std::path::{Path, PathBuf};

use promptlab_core::config::SecretConfig;
use thiserror::Error;

use crate::paths::PromptLabPaths;

#[derive(Error, Debug)]
pub enum SecretStorageError {
    #[error("No secret file at {}; run `promptlab config init` to create one", .0.display())]
    Missing(PathBuf),

    #[error("Could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid secret JSON (line {line}, column {column})", .path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        column: usize,
    },

    #[error("Could not determine the PromptLab config directory")]
    NoConfigDir,
}

pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Storage at `~/.config/promptlab/secret.json`.
    pub fn new() -> Result<Self, SecretStorageError> {
        let path = PromptLabPaths::secret_file().map_err(|_| SecretStorageError::NoConfigDir)?;
        Ok(Self::with_path(path))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the secret file. A blank file counts as one without providers.
    pub fn load(&self) -> Result<SecretConfig, SecretStorageError> {
        if !self.exists() {
            return Err(SecretStorageError::Missing(self.path.clone()));
        }

        let raw = fs::read_to_string(&self.path).map_err(|source| SecretStorageError::Read {
            path: self.path.clone(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(SecretConfig::default());
        }

        // Position only: the error must not echo key material.
        serde_json::from_str(&raw).map_err(|err| SecretStorageError::Malformed {
            path: self.path.clone(),
            line: err.line(),
            column: err.column(),
        })
    }
}
