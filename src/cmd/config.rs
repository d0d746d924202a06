//! Configuration view and validation commands: `corkboard config`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use corkboard::config::{AppConfig, DEFAULT_CONFIG_FILE};

use super::super::ConfigCommands;

pub fn cmd_config(
    config: &AppConfig,
    path: Option<&Path>,
    command: Option<ConfigCommands>,
) -> Result<()> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Corkboard Configuration");
            println!("=======================");
            println!();
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No corkboard.toml found at {}", config_path.display());
                println!("Using defaults.");
            }
            println!();

            let rendered =
                toml::to_string_pretty(config).context("Failed to render configuration")?;
            println!("Effective values (with env overrides):");
            println!();
            print!("{}", rendered);
            println!();
            let key_state = if config.search.api_key.is_some() {
                "set"
            } else {
                "not set"
            };
            println!("SEARCH_API_KEY: {}", key_state);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in &warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
            if !warnings.is_empty() {
                anyhow::bail!("{} configuration problem(s)", warnings.len());
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("corkboard.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            AppConfig::default().save(&config_path)?;

            println!("Created corkboard.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] port, frontend_url, dev_mode");
            println!("  - [store] path");
            println!("  - [search] backend, app_id, index_name, shared_page_size");
            println!("  - [logging] level, json, directory");
            println!();
        }
    }

    Ok(())
}
