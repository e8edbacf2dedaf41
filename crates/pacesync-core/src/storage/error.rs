//! File store error handling
//!
//! Typed errors for reading pacenote files, with the offending path
//! attached so that a dropped event can be logged meaningfully.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing INI text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IniError {
    /// A section header was opened but never closed
    #[error("line {line}: unterminated section header")]
    UnterminatedSection { line: usize },

    /// A key/value line with nothing before the `=`
    #[error("line {line}: missing key before '='")]
    EmptyKey { line: usize },
}

/// Errors that can occur while reading a pacenote file
#[derive(Error, Debug)]
pub enum FileStoreError {
    /// File could not be read or stat'ed
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File is not valid INI text
    #[error("Invalid INI in '{path}': {details}")]
    Parse { path: PathBuf, details: String },
}

impl FileStoreError {
    /// Create an error from an I/O error with path context
    ///
    /// Non UTF-8 content surfaces from the reader as `InvalidData`; that is a
    /// format problem rather than an access problem.
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::InvalidData => FileStoreError::Parse {
                path,
                details: error.to_string(),
            },
            _ => FileStoreError::Read {
                path,
                source: error,
            },
        }
    }

    /// Whether the file disappeared between discovery and read
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FileStoreError::Read { source, .. } if source.kind() == io::ErrorKind::NotFound
        )
    }
}

/// Result type for file store operations
pub type FileStoreResult<T> = Result<T, FileStoreError>;
