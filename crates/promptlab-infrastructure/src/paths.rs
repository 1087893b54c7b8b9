//! Unified path management for PromptLab configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/promptlab/         # Config directory (platform config dir)
//! ├── config.toml              # Application configuration
//! └── secret.json              # API keys
//! ```

use std::path::PathBuf;

use promptlab_core::config::{DEFAULT_REMOTE_MODEL, OpenAIConfig, SecretConfig};

const APP_DIR_NAME: &str = "promptlab";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

pub struct PromptLabPaths;

impl PromptLabPaths {
    /// Returns the PromptLab configuration directory (e.g. `~/.config/promptlab/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to `secret.json`.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600).
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    /// Ensures the secret file exists, creating a template with an empty API
    /// key if it doesn't. Permissions are set to 600 on Unix.
    pub fn ensure_secret_file() -> Result<PathBuf, std::io::Error> {
        let secret_path = Self::secret_file()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()))?;
        Self::write_secret_template(&secret_path)?;
        Ok(secret_path)
    }

    /// Writes the secret template to `secret_path` unless a file is already there.
    pub fn write_secret_template(secret_path: &std::path::Path) -> Result<(), std::io::Error> {
        if secret_path.exists() {
            return Ok(());
        }

        if let Some(parent) = secret_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template_config = SecretConfig {
            openai: Some(OpenAIConfig {
                api_key: String::new(),
                model_name: Some(DEFAULT_REMOTE_MODEL.to_string()),
            }),
        };

        let template_json = serde_json::to_string_pretty(&template_config)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(secret_path, template_json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(secret_path, permissions)?;
        }

        tracing::info!("[Paths] Created secret template at {}", secret_path.display());
        Ok(())
    }
}
