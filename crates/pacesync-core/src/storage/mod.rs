//! Storage layer
//!
//! Read-only access to the simulator's INI files.
//!
//! - `ini`: the INI dialect parser
//! - `file_store`: async and blocking readers with typed errors

pub mod error;
pub mod file_store;
pub mod ini;

pub use error::{FileStoreError, FileStoreResult, IniError};
pub use ini::{IniDocument, IniSection};
