//! Simulator installation layout
//!
//! Well-known locations beneath the simulator install root, and the
//! eligibility rules for files inside the watched pacenote subtree.

use std::path::{Component, Path, PathBuf};

/// Plugin directory that owns the pacenotes and race statistics
pub const PLUGIN_NAME: &str = "NGPCarMenu";

/// Only files with this extension are synchronized
pub const PACENOTE_EXTENSION: &str = "ini";

/// Directory watched for pacenote files
pub fn pacenote_dir(install_root: &Path) -> PathBuf {
    install_root
        .join("Plugins")
        .join(PLUGIN_NAME)
        .join("MyPacenotes")
}

/// Path to the car slot configuration
pub fn cars_ini_path(install_root: &Path) -> PathBuf {
    install_root.join("Cars").join("Cars.ini")
}

/// Path to the race statistics database
pub fn race_stat_db_path(install_root: &Path) -> PathBuf {
    install_root
        .join("Plugins")
        .join(PLUGIN_NAME)
        .join("RaceStat")
        .join("raceStatDB.sqlite3")
}

/// Check whether a path carries the pacenote extension (case-sensitive)
pub fn has_pacenote_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == PACENOTE_EXTENSION)
}

/// Compute the device-facing path of `path` relative to `root`
///
/// Returns `None` when the path lies outside `root` or escapes it through
/// a `..` component. Separators are always forward slashes.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Relative path of an eligible pacenote file, or `None` if it must be ignored
pub fn pacenote_relative_path(root: &Path, path: &Path) -> Option<String> {
    if !has_pacenote_extension(path) {
        return None;
    }
    relative_to(root, path)
}
