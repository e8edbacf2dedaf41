//! Logging setup
//!
//! Level comes from `PACESYNC_LOG`. Logs go to stderr, or to
//! `config.log_file` when one is configured.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::EnvFilter;

use pacesync_core::Config;

/// Environment variable holding the log level
pub const LOG_ENV: &str = "PACESYNC_LOG";

/// Initialize logging
///
/// `default_level` applies when `PACESYNC_LOG` is unset; `None` disables
/// logging in that case.
pub fn init_logging(config: &Config, default_level: Option<&str>) {
    let log_level = match std::env::var(LOG_ENV) {
        Ok(level) => level,
        Err(_) => match default_level {
            Some(level) => level.to_string(),
            None => return,
        },
    };

    let env_filter = EnvFilter::new(format!(
        "pacesync_core={},pacesync={}",
        log_level, log_level
    ));

    if let Some(log_path) = &config.log_file {
        let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                return;
            }
        };

        // Ignore error if already initialized
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(log_file))
            .try_init();

        info!("Logging to {:?}", log_path);
        return;
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
