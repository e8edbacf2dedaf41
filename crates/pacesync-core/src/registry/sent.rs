//! Sent file ledger
//!
//! Records which files have been broadcast at least once during the current
//! watch session. It is the source list for resync and for status display.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Ledger of files broadcast at least once
#[derive(Debug, Default)]
pub struct SentRegistry {
    /// File identity → modification time when first broadcast
    files: BTreeMap<PathBuf, DateTime<Utc>>,
}

impl SentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file as broadcast
    ///
    /// Returns `false` if the file was already recorded; the original entry
    /// is overwritten with the newer modification time.
    pub fn mark_sent(&mut self, path: &Path, modified: DateTime<Utc>) -> bool {
        self.files.insert(path.to_path_buf(), modified).is_none()
    }

    /// Check whether a file was broadcast
    pub fn has(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    /// Modification time recorded for a broadcast file
    pub fn sent_modified(&self, path: &Path) -> Option<DateTime<Utc>> {
        self.files.get(path).copied()
    }

    /// All broadcast files, ordered by path
    pub fn all(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    /// Forget a file after it was removed from disk
    ///
    /// Deliveries already made are not retracted.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.files.remove(path).is_some()
    }

    /// Clear all state (watched root changed)
    pub fn reset(&mut self) {
        self.files.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_sent_once() {
        let mut registry = SentRegistry::new();
        let path = PathBuf::from("/notes/stage1.ini");

        assert!(registry.mark_sent(&path, Utc::now()));
        assert!(!registry.mark_sent(&path, Utc::now()));
        assert!(registry.has(&path));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_all_is_ordered() {
        let mut registry = SentRegistry::new();
        registry.mark_sent(Path::new("/notes/b.ini"), Utc::now());
        registry.mark_sent(Path::new("/notes/a.ini"), Utc::now());

        let all: Vec<_> = registry.all().collect();
        assert_eq!(all, vec![Path::new("/notes/a.ini"), Path::new("/notes/b.ini")]);
    }

    #[test]
    fn test_remove_and_reset() {
        let mut registry = SentRegistry::new();
        let path = PathBuf::from("/notes/stage1.ini");
        registry.mark_sent(&path, Utc::now());
        registry.mark_sent(Path::new("/notes/stage2.ini"), Utc::now());

        assert!(registry.remove(&path));
        assert!(!registry.remove(&path));
        assert!(!registry.has(&path));

        registry.reset();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sent_modified() {
        let mut registry = SentRegistry::new();
        let path = PathBuf::from("/notes/stage1.ini");
        let when = Utc::now();
        registry.mark_sent(&path, when);

        assert_eq!(registry.sent_modified(&path), Some(when));
        assert_eq!(registry.sent_modified(Path::new("/notes/other.ini")), None);
    }
}
