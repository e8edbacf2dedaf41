//! Desktop shell surface
//!
//! The engine never talks to a UI directly. It publishes a status snapshot
//! on a watch channel and emits shell events on an mpsc channel; a shell
//! (or the CLI) subscribes to both.

use std::path::PathBuf;

use serde::Serialize;

/// Point-in-time view of the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Simulator install root, if configured
    pub folder_path: Option<PathBuf>,
    /// Address devices should connect to
    pub ws_url: Option<String>,
    /// Identified devices, sorted
    pub connected_devices: Vec<String>,
    /// Files broadcast under the current root, sorted
    pub sent_files: Vec<PathBuf>,
}

/// Display modes of the desktop shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShellMode {
    Normal,
    DragDrop,
}

/// Requests from the engine to the desktop shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellEvent {
    SwitchMode(ShellMode),
}
