//! `config.toml` storage.
//!
//! Saves go through a temp file and an atomic rename so a crash never leaves
//! a half-written config behind.

use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use promptlab_core::config::AppConfig;
use promptlab_core::{PromptLabError, Result};

use crate::paths::PromptLabPaths;

pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Storage at the default location (`~/.config/promptlab/config.toml`).
    pub fn default_location() -> Result<Self> {
        let path = PromptLabPaths::config_file().map_err(|e| PromptLabError::config(e.to_string()))?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the config. A missing or empty file yields the defaults; a
    /// malformed one is a configuration error.
    pub fn load(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            tracing::debug!("[ConfigStorage] No config at {}, using defaults", self.path.display());
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(AppConfig::default());
        }

        toml::from_str(&content).map_err(|e| {
            PromptLabError::config(format!(
                "Failed to parse configuration file at {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Writes the config atomically (tmp file + fsync + rename).
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        let tmp_path = self.path.with_extension("toml.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        tracing::info!("[ConfigStorage] Saved config to {}", self.path.display());
        Ok(())
    }
}
