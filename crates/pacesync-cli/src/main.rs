//! Pacesync CLI
//!
//! Command-line interface for pacesync - pacenote sync to connected devices.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logging;
mod output;

use commands::serve::ServeArgs;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "pacesync")]
#[command(about = "Pacesync - push simulator pacenotes to connected devices")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync server (default)
    Serve {
        /// Simulator install root (overrides folder_path)
        #[arg(long)]
        root: Option<PathBuf>,
        /// WebSocket port
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Look up the RSF car id for a car slot
    CarId {
        /// Path to Cars.ini
        cars_ini: PathBuf,
        /// Car slot number
        slot: i64,
    },
    /// Show the fastest recorded run for a stage
    StageTimes {
        /// Stage (map) id
        stage: i64,
        /// Car slot number
        slot: i64,
        /// Simulator install root (overrides folder_path)
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (folder_path, port, bind_address, log_file, redelivery)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    match cli.command {
        None => commands::serve::run(config_path, ServeArgs::default(), &output).await,
        Some(Commands::Serve { root, port, bind }) => {
            commands::serve::run(config_path, ServeArgs { root, port, bind }, &output).await
        }
        Some(Commands::CarId { cars_ini, slot }) => {
            commands::car_id::lookup(cars_ini, slot, &output)
        }
        Some(Commands::StageTimes { stage, slot, root }) => {
            commands::stage_times::query(config_path, stage, slot, root, &output).await
        }
        Some(Commands::Config { command }) => handle_config_command(command, config_path, &output),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_is_serve() {
        let cli = Cli::try_parse_from(["pacesync"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["pacesync", "--json", "car-id", "Cars.ini", "5"]).unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Some(Commands::CarId { slot: 5, .. })
        ));
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from(["pacesync", "serve", "--root", "/games/rbr", "-p", "9000"])
            .unwrap();
        match cli.command {
            Some(Commands::Serve { root, port, bind }) => {
                assert_eq!(root, Some(PathBuf::from("/games/rbr")));
                assert_eq!(port, Some(9000));
                assert!(bind.is_none());
            }
            _ => panic!("Expected serve"),
        }
    }
}
