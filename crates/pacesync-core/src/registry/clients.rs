//! Connected device sessions
//!
//! Sessions are keyed by the device id the client presents. Identifying
//! again always supersedes the previous session for that id: the delivered
//! set starts empty because identification triggers a full resend. A second
//! connection presenting the same id is treated as the successor of the
//! first, not as a duplicate.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::sync::ConnectionId;

/// A connected, identified device
#[derive(Debug)]
pub struct ClientSession {
    device_id: String,
    conn: ConnectionId,
    delivered: HashSet<PathBuf>,
}

impl ClientSession {
    fn new(device_id: String, conn: ConnectionId) -> Self {
        Self {
            device_id,
            conn,
            delivered: HashSet::new(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Transport handle the session is bound to
    pub fn conn(&self) -> ConnectionId {
        self.conn
    }

    /// Check whether a file was delivered to this session
    pub fn has_delivered(&self, path: &Path) -> bool {
        self.delivered.contains(path)
    }

    /// Record a delivery; returns `false` if it was already recorded
    pub fn mark_delivered(&mut self, path: &Path) -> bool {
        self.delivered.insert(path.to_path_buf())
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }
}

/// Registry of identified devices
#[derive(Debug, Default)]
pub struct ClientRegistry {
    sessions: BTreeMap<String, ClientSession>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or re-register a device, discarding its prior deliveries
    pub fn identify(&mut self, device_id: &str, conn: ConnectionId) -> &mut ClientSession {
        let session = ClientSession::new(device_id.to_string(), conn);
        match self.sessions.entry(device_id.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(session);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(session),
        }
    }

    /// Drop every session bound to a closed connection
    ///
    /// Returns the device ids that were removed.
    pub fn forget(&mut self, conn: ConnectionId) -> Vec<String> {
        let removed: Vec<String> = self
            .sessions
            .values()
            .filter(|s| s.conn == conn)
            .map(|s| s.device_id.clone())
            .collect();
        for device_id in &removed {
            self.sessions.remove(device_id);
        }
        removed
    }

    pub fn lookup(&self, device_id: &str) -> Option<&ClientSession> {
        self.sessions.get(device_id)
    }

    pub fn lookup_mut(&mut self, device_id: &str) -> Option<&mut ClientSession> {
        self.sessions.get_mut(device_id)
    }

    /// Check whether a file was delivered to a device
    pub fn delivered(&self, device_id: &str, path: &Path) -> bool {
        self.sessions
            .get(device_id)
            .is_some_and(|s| s.has_delivered(path))
    }

    /// Record a delivery to a device; unknown devices are ignored
    pub fn mark_delivered(&mut self, device_id: &str, path: &Path) {
        if let Some(session) = self.sessions.get_mut(device_id) {
            session.mark_delivered(path);
        }
    }

    /// Remove one file from every delivered set so it can be pushed again
    pub fn retract(&mut self, path: &Path) {
        for session in self.sessions.values_mut() {
            session.delivered.remove(path);
        }
    }

    /// Clear every delivered set, keeping the sessions (watched root changed)
    pub fn clear_deliveries(&mut self) {
        for session in self.sessions.values_mut() {
            session.delivered.clear();
        }
    }

    /// Identified device ids, ordered
    pub fn device_ids(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }

    pub fn sessions_mut(&mut self) -> impl Iterator<Item = &mut ClientSession> {
        self.sessions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
