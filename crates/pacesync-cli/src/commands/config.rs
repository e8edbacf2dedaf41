//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use pacesync_core::{Config, RedeliveryPolicy};

use crate::output::{Output, OutputFormat};

fn display_path(path: Option<&PathBuf>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "folder_path": config.folder_path,
                    "port": config.port,
                    "bind_address": config.bind_address,
                    "log_file": config.log_file,
                    "redelivery": config.redelivery.to_string()
                })
            );
        }
        OutputFormat::Quiet => {
            if let Some(ref folder) = config.folder_path {
                println!("{}", folder.display());
            }
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!(
                "  folder_path:  {}",
                display_path(config.folder_path.as_ref())
            );
            println!("  port:         {}", config.port);
            println!("  bind_address: {}", config.bind_address);
            println!("  log_file:     {}", display_path(config.log_file.as_ref()));
            println!("  redelivery:   {}", config.redelivery);
            if let Some(dir) = config.pacenote_dir() {
                println!();
                println!("Watching: {}", dir.display());
            }
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match key.as_str() {
        "folder_path" => {
            config.folder_path = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.clone().into())
            };
        }
        "port" => {
            config.port = value
                .parse()
                .context("Invalid value for port. Use a number between 0 and 65535.")?;
        }
        "bind_address" => {
            if value.is_empty() {
                bail!("bind_address cannot be empty");
            }
            config.bind_address = value.clone();
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.clone().into())
            };
        }
        "redelivery" => {
            config.redelivery = value
                .parse::<RedeliveryPolicy>()
                .map_err(anyhow::Error::msg)?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: folder_path, port, bind_address, log_file, redelivery",
                key
            );
        }
    }

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}
