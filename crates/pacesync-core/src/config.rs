//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/pacesync/config.json)
//! 3. Environment variables (PACESYNC_* prefix)
//!
//! Environment variables take precedence over config file values. A missing
//! config file is created with defaults on first load.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::layout;
use crate::sync::RedeliveryPolicy;

/// Environment variable prefix
const ENV_PREFIX: &str = "PACESYNC";

/// Default WebSocket port
pub const DEFAULT_PORT: u16 = 8080;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Simulator install root
    #[serde(default)]
    pub folder_path: Option<PathBuf>,

    /// WebSocket port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address the WebSocket server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Write logs here instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Whether edited files are pushed again
    #[serde(default)]
    pub redelivery: RedeliveryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            folder_path: None,
            port: DEFAULT_PORT,
            bind_address: default_bind_address(),
            log_file: None,
            redelivery: RedeliveryPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (PACESYNC_FOLDER_PATH, PACESYNC_PORT, ...)
    /// 2. Config file (~/.config/pacesync/config.json or PACESYNC_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from an explicit path if given, otherwise the default location
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, it is created with defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            debug!("Creating default config at {:?}", path);
            let config = Self::default();
            if let Err(e) = config.save_to_path(path) {
                warn!("Could not write default config: {:#}", e);
            }
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a JSON string (useful for testing)
    pub fn load_from_str(json_content: &str) -> Result<Self> {
        let mut config: Config =
            serde_json::from_str(json_content).context("Failed to parse config JSON")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // PACESYNC_FOLDER_PATH
        if let Ok(val) = std::env::var(format!("{}_FOLDER_PATH", ENV_PREFIX)) {
            self.folder_path = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        // PACESYNC_PORT
        if let Ok(val) = std::env::var(format!("{}_PORT", ENV_PREFIX)) {
            match val.parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!("Ignoring invalid {}_PORT '{}'", ENV_PREFIX, val),
            }
        }

        // PACESYNC_BIND_ADDRESS
        if let Ok(val) = std::env::var(format!("{}_BIND_ADDRESS", ENV_PREFIX)) {
            if !val.is_empty() {
                self.bind_address = val;
            }
        }

        // PACESYNC_REDELIVERY
        if let Ok(val) = std::env::var(format!("{}_REDELIVERY", ENV_PREFIX)) {
            match val.parse() {
                Ok(policy) => self.redelivery = policy,
                Err(e) => warn!("Ignoring {}_REDELIVERY: {}", ENV_PREFIX, e),
            }
        }
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with PACESYNC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pacesync")
            .join("config.json")
    }

    /// Get the watched pacenote directory
    pub fn pacenote_dir(&self) -> Option<PathBuf> {
        self.folder_path.as_deref().map(layout::pacenote_dir)
    }

    /// Get the path to `Cars.ini`
    pub fn cars_ini_path(&self) -> Option<PathBuf> {
        self.folder_path.as_deref().map(layout::cars_ini_path)
    }

    /// Get the path to the race statistics database
    pub fn race_stat_db_path(&self) -> Option<PathBuf> {
        self.folder_path.as_deref().map(layout::race_stat_db_path)
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "PACESYNC_FOLDER_PATH",
        "PACESYNC_PORT",
        "PACESYNC_BIND_ADDRESS",
        "PACESYNC_REDELIVERY",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.folder_path.is_none());
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.redelivery, RedeliveryPolicy::OncePerPath);
    }

    #[test]
    fn test_derived_paths() {
        let config = Config {
            folder_path: Some(PathBuf::from("/games/rbr")),
            ..Config::default()
        };

        assert!(config
            .pacenote_dir()
            .unwrap()
            .ends_with("Plugins/NGPCarMenu/MyPacenotes"));
        assert!(config.cars_ini_path().unwrap().ends_with("Cars/Cars.ini"));
        assert!(config
            .race_stat_db_path()
            .unwrap()
            .ends_with("raceStatDB.sqlite3"));

        assert!(Config::default().pacenote_dir().is_none());
    }

    #[test]
    fn test_legacy_file_shape() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::load_from_str(r#"{ "folderPath": "C:/Games/RBR" }"#).unwrap();
        assert_eq!(config.folder_path, Some(PathBuf::from("C:/Games/RBR")));
        assert_eq!(config.port, DEFAULT_PORT);

        let config = Config::load_from_str(r#"{ "folderPath": null }"#).unwrap();
        assert!(config.folder_path.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("PACESYNC_FOLDER_PATH", "/tmp/rbr");
        env::set_var("PACESYNC_PORT", "9001");
        env::set_var("PACESYNC_BIND_ADDRESS", "127.0.0.1");
        env::set_var("PACESYNC_REDELIVERY", "newer-modification");
        config.apply_env_overrides();

        assert_eq!(config.folder_path, Some(PathBuf::from("/tmp/rbr")));
        assert_eq!(config.port, 9001);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.redelivery, RedeliveryPolicy::NewerModification);

        // Empty string clears the folder, invalid values are ignored
        env::set_var("PACESYNC_FOLDER_PATH", "");
        env::set_var("PACESYNC_PORT", "not-a-port");
        config.apply_env_overrides();
        assert!(config.folder_path.is_none());
        assert_eq!(config.port, 9001);
    }

    #[test]
    fn test_missing_file_is_created() {
        let _guard = EnvGuard::new(ENV_VARS);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["folderPath"], serde_json::Value::Null);
        assert_eq!(written["redelivery"], "once-per-path");
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let config = Config {
            folder_path: Some(PathBuf::from("/games/rbr")),
            port: 9100,
            log_file: Some(PathBuf::from("/tmp/pacesync.log")),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(Config::load_from_path(&path).is_err());
    }
}
