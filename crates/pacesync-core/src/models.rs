//! Data models for pacesync
//!
//! Defines the pacenote file as the engine sees it after a successful read.

use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::storage::IniDocument;

/// A pacenote file read from the watched subtree
#[derive(Debug, Clone, PartialEq)]
pub struct PacenoteFile {
    /// Absolute path; this is the file's identity
    pub path: PathBuf,
    /// Path relative to the watched subtree, forward slashes
    pub relative_path: String,
    /// Parsed content
    pub content: IniDocument,
    /// Last modification time
    pub modified: DateTime<Utc>,
}

impl PacenoteFile {
    /// Modification time as sent to devices
    pub fn modified_iso(&self) -> String {
        format_timestamp(&self.modified)
    }
}

/// Format a timestamp as ISO-8601 with millisecond precision and a `Z` suffix
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
