use anyhow::{Context, Result};
use colored::Colorize;
use promptlab_core::config::AppConfig;
use promptlab_infrastructure::PromptLabPaths;

use super::utils::{config_storage, load_config};
use crate::GlobalArgs;

/// Writes a default config.toml and a secret.json template, leaving existing
/// files untouched.
pub fn init(global: &GlobalArgs) -> Result<()> {
    let storage = config_storage(global)?;

    if storage.path().exists() {
        println!(
            "{}",
            format!("Config already exists: {}", storage.path().display()).bright_black()
        );
    } else {
        storage.save(&AppConfig::default())?;
        println!("{}", format!("Created {}", storage.path().display()).green());
    }

    let secret_path =
        PromptLabPaths::ensure_secret_file().context("Failed to create secret.json template")?;
    println!("{}", format!("Secret file: {}", secret_path.display()).green());
    println!(
        "{}",
        "Put your OpenAI API key into secret.json or set OPENAI_API_KEY.".bright_black()
    );

    Ok(())
}

/// Prints the effective configuration, command-line overrides included.
pub fn show(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;

    print!("{}", rendered);
    if config.model.is_none() {
        println!("# model (default) = \"{}\"", config.model());
    }

    Ok(())
}

pub fn path(global: &GlobalArgs) -> Result<()> {
    let storage = config_storage(global)?;
    println!("config: {}", storage.path().display());

    match PromptLabPaths::secret_file() {
        Ok(secret) => println!("secret: {}", secret.display()),
        Err(e) => println!("secret: {}", e.to_string().red()),
    }

    Ok(())
}
