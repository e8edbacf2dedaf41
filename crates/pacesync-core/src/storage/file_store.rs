//! Pacenote file access
//!
//! Reads and parses INI files and stats them for their modification time.
//! Async variants are used by the engine; the blocking variant serves the
//! query service, which already runs on a blocking thread.

use std::path::Path;

use chrono::{DateTime, Utc};

use super::error::{FileStoreError, FileStoreResult};
use super::ini::IniDocument;
use crate::models::PacenoteFile;

/// Read and parse a file, returning its content and modification time
pub async fn read(path: &Path) -> FileStoreResult<(IniDocument, DateTime<Utc>)> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FileStoreError::from_io(e, path.to_path_buf()))?;
    let content = parse(path, &text)?;
    let modified = modified(path).await?;
    Ok((content, modified))
}

/// Read a pacenote file into its device-facing form
pub async fn read_pacenote(path: &Path, relative_path: String) -> FileStoreResult<PacenoteFile> {
    let (content, modified) = read(path).await?;
    Ok(PacenoteFile {
        path: path.to_path_buf(),
        relative_path,
        content,
        modified,
    })
}

/// Stat a file for its modification time
pub async fn modified(path: &Path) -> FileStoreResult<DateTime<Utc>> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| FileStoreError::from_io(e, path.to_path_buf()))?;
    let modified = metadata
        .modified()
        .map_err(|e| FileStoreError::from_io(e, path.to_path_buf()))?;
    Ok(DateTime::<Utc>::from(modified))
}

/// Read a file's raw text (no parsing)
pub async fn read_text(path: &Path) -> FileStoreResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FileStoreError::from_io(e, path.to_path_buf()))
}

/// Blocking read and parse, for callers already off the event loop
pub fn read_blocking(path: &Path) -> FileStoreResult<IniDocument> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| FileStoreError::from_io(e, path.to_path_buf()))?;
    parse(path, &text)
}

fn parse(path: &Path, text: &str) -> FileStoreResult<IniDocument> {
    IniDocument::parse(text).map_err(|e| FileStoreError::Parse {
        path: path.to_path_buf(),
        details: e.to_string(),
    })
}
