//! Pacenote directory watcher
//!
//! Monitors the pacenote subtree recursively and reports discrete
//! discovered / modified / removed events for eligible `.ini` files.
//!
//! ## Lifecycle
//!
//! 1. Check the root exists and register a recursive `notify` watch
//! 2. Scan the tree and report every eligible file as discovered
//! 3. Translate `notify` events until the receiver goes away
//!
//! Any fatal error (root missing, root removed, backend error) tears the
//! session down; the task then waits according to its [`RestartPolicy`]
//! and starts again from step 1.

mod restart;

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::layout::pacenote_relative_path;

pub use restart::{RestartPolicy, DEFAULT_RESTART_DELAY};

/// A change to an eligible pacenote file (absolute path)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// File seen for the first time (initial scan, creation, rename into)
    Discovered(PathBuf),
    /// File content changed
    Modified(PathBuf),
    /// File deleted or renamed away
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Discovered(p) | WatchEvent::Modified(p) | WatchEvent::Removed(p) => p,
        }
    }
}

/// Fatal monitoring errors; each one triggers a restart
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watched directory '{0}' does not exist")]
    MissingRoot(PathBuf),

    #[error("Watched directory '{0}' was removed")]
    RootRemoved(PathBuf),

    #[error("Filesystem watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Watcher configuration for one root directory
#[derive(Debug, Clone)]
pub struct DirectoryWatcher {
    root: PathBuf,
    policy: RestartPolicy,
}

impl DirectoryWatcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            policy: RestartPolicy::default(),
        }
    }

    pub fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start watching on a background task
    ///
    /// The task stops when the handle is dropped, when the receiving side of
    /// `events` is dropped, or when the restart policy gives up.
    pub fn spawn(self, events: mpsc::UnboundedSender<WatchEvent>) -> WatcherHandle {
        let root = self.root.clone();
        let task = tokio::spawn(run(self.root, self.policy, events));
        WatcherHandle { root, task }
    }
}

/// Handle to a running watcher task
#[derive(Debug)]
pub struct WatcherHandle {
    root: PathBuf,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop the watcher; the `notify` backend is released with the task
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(root: PathBuf, policy: RestartPolicy, events: mpsc::UnboundedSender<WatchEvent>) {
    let mut attempt = 0u32;

    loop {
        match watch_session(&root, &events).await {
            Ok(()) => {
                debug!("Watcher for {} stopped: receiver closed", root.display());
                return;
            }
            Err(e) => warn!("Watcher for {} failed: {}", root.display(), e),
        }

        attempt += 1;
        let Some(delay) = policy.next_delay(attempt) else {
            error!(
                "Giving up on watching {} after {} restarts",
                root.display(),
                attempt - 1
            );
            return;
        };

        info!("Restarting watcher for {} in {:?}", root.display(), delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = events.closed() => return,
        }
    }
}

/// One monitoring session; `Ok` means the receiver went away
async fn watch_session(
    root: &Path,
    events: &mpsc::UnboundedSender<WatchEvent>,
) -> Result<(), WatchError> {
    let is_dir = tokio::fs::metadata(root)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(WatchError::MissingRoot(root.to_path_buf()));
    }

    // Backends may report canonical paths; map them back onto `root`
    let canonical_root = tokio::fs::canonicalize(root)
        .await
        .unwrap_or_else(|_| root.to_path_buf());

    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = raw_tx.send(res);
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    info!("Watching {}", root.display());

    let scan_root = root.to_path_buf();
    let existing = match tokio::task::spawn_blocking(move || scan(&scan_root)).await {
        Ok(paths) => paths,
        Err(e) => {
            warn!("Initial scan of {} failed: {}", root.display(), e);
            Vec::new()
        }
    };
    debug!("Initial scan found {} pacenote files", existing.len());
    for path in existing {
        if events.send(WatchEvent::Discovered(path)).is_err() {
            return Ok(());
        }
    }

    loop {
        tokio::select! {
            raw = raw_rx.recv() => match raw {
                Some(Ok(event)) => {
                    let event = rebase_event(&canonical_root, root, event);
                    if removes_root(root, &event) {
                        return Err(WatchError::RootRemoved(root.to_path_buf()));
                    }
                    for change in translate(root, event) {
                        if events.send(change).is_err() {
                            return Ok(());
                        }
                    }
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
            _ = events.closed() => return Ok(()),
        }
    }
}

/// Every eligible file currently under `root`
fn scan(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| pacenote_relative_path(root, path).is_some())
        .collect()
}

fn rebase_event(canonical_root: &Path, root: &Path, mut event: Event) -> Event {
    if canonical_root == root {
        return event;
    }
    for path in &mut event.paths {
        if let Ok(relative) = path.strip_prefix(canonical_root) {
            *path = root.join(relative);
        }
    }
    event
}

fn removes_root(root: &Path, event: &Event) -> bool {
    let removal = matches!(
        event.kind,
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From))
    );
    removal && event.paths.iter().any(|p| p == root)
}

/// Map a backend event onto pacenote events, dropping ineligible paths
fn translate(root: &Path, event: Event) -> Vec<WatchEvent> {
    let changes: Vec<WatchEvent> = match event.kind {
        EventKind::Create(_) => event.paths.into_iter().map(WatchEvent::Discovered).collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            event.paths.into_iter().map(WatchEvent::Removed).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.into_iter().map(WatchEvent::Discovered).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut paths = event.paths.into_iter();
            let mut changes = Vec::new();
            if let Some(from) = paths.next() {
                changes.push(WatchEvent::Removed(from));
            }
            changes.extend(paths.map(WatchEvent::Discovered));
            changes
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .into_iter()
            .map(|p| {
                if p.exists() {
                    WatchEvent::Discovered(p)
                } else {
                    WatchEvent::Removed(p)
                }
            })
            .collect(),
        EventKind::Modify(_) => event.paths.into_iter().map(WatchEvent::Modified).collect(),
        EventKind::Remove(_) => event.paths.into_iter().map(WatchEvent::Removed).collect(),
        _ => Vec::new(),
    };

    changes
        .into_iter()
        .filter(|change| pacenote_relative_path(root, change.path()).is_some())
        .collect()
}
