//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use pacesync_core::{StageTimesReply, StatusSnapshot};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in JSON mode
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print an engine status snapshot
    pub fn print_status(&self, status: &StatusSnapshot) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "Folder:  {}",
                    status
                        .folder_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(not set)".to_string())
                );
                println!(
                    "Devices: {}",
                    if status.connected_devices.is_empty() {
                        "(none)".to_string()
                    } else {
                        status.connected_devices.join(", ")
                    }
                );
                println!("Sent:    {} file(s)", status.sent_files.len());
            }
            OutputFormat::Json => print_json(status),
            OutputFormat::Quiet => {}
        }
    }

    /// Print a stage time reply
    pub fn print_stage_times(&self, reply: &StageTimesReply) {
        match self.format {
            OutputFormat::Human => match reply {
                StageTimesReply::Rows(rows) if rows.is_empty() => {
                    println!("No finished runs found.");
                }
                StageTimesReply::Rows(rows) => {
                    for row in rows {
                        for (column, value) in row {
                            println!("{:<18} {}", format!("{}:", column), display_value(value));
                        }
                    }
                }
                StageTimesReply::Failure { error } => println!("{}", error),
                StageTimesReply::Unavailable => println!("Stage times unavailable."),
            },
            OutputFormat::Json => print_json(reply),
            OutputFormat::Quiet => {
                if let StageTimesReply::Rows(rows) = reply {
                    for row in rows {
                        if let Some(time) = row.get("FastestStageTime") {
                            println!("{}", display_value(time));
                        }
                    }
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

/// Render a JSON scalar without quotes
fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
