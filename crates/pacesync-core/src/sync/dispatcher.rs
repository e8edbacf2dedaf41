//! Broadcast dispatcher
//!
//! Owns the sent and client registries and turns watcher events, device
//! messages and shell requests into pushes. Every method runs to completion
//! on the engine loop before the next event is handled, so the registries
//! need no locking.
//!
//! Delivery rules:
//! - a file is pushed to each live session at most once
//! - identifying triggers a full resend to that device
//! - an already-sent file is only pushed again if the [`RedeliveryPolicy`]
//!   says so

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::message::{InboundMessage, OutboundMessage};
use super::policy::{Admission, RedeliveryPolicy};
use super::status::{ShellEvent, ShellMode, StatusSnapshot};
use super::transport::{ConnectionId, Transport, TransportError};
use crate::layout::{pacenote_dir, pacenote_relative_path};
use crate::query::{StageTimesQuery, StageTimesReply, StageTimesRequest};
use crate::registry::{ClientRegistry, SentRegistry};
use crate::storage::file_store;
use crate::watcher::WatchEvent;

pub struct Dispatcher<T: Transport> {
    transport: T,
    sent: SentRegistry,
    clients: ClientRegistry,
    policy: RedeliveryPolicy,
    query: Arc<dyn StageTimesQuery>,
    install_root: Option<PathBuf>,
    ws_url: Option<String>,
    drag_requester: Option<ConnectionId>,
    status_tx: watch::Sender<StatusSnapshot>,
    shell_tx: mpsc::UnboundedSender<ShellEvent>,
    shell_rx: Option<mpsc::UnboundedReceiver<ShellEvent>>,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, query: Arc<dyn StageTimesQuery>) -> Self {
        let (status_tx, _) = watch::channel(StatusSnapshot::default());
        let (shell_tx, shell_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            sent: SentRegistry::new(),
            clients: ClientRegistry::new(),
            policy: RedeliveryPolicy::default(),
            query,
            install_root: None,
            ws_url: None,
            drag_requester: None,
            status_tx,
            shell_tx,
            shell_rx: Some(shell_rx),
        }
    }

    pub fn with_policy(mut self, policy: RedeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Address advertised in the status snapshot
    pub fn with_ws_url(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = Some(ws_url.into());
        self.publish_status();
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn policy(&self) -> RedeliveryPolicy {
        self.policy
    }

    pub fn install_root(&self) -> Option<&Path> {
        self.install_root.as_deref()
    }

    pub fn sent(&self) -> &SentRegistry {
        &self.sent
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusSnapshot> {
        self.status_tx.subscribe()
    }

    /// Take the shell event receiver (can only be called once)
    pub fn take_shell_events(&mut self) -> Option<mpsc::UnboundedReceiver<ShellEvent>> {
        self.shell_rx.take()
    }

    fn pacenote_root(&self) -> Option<PathBuf> {
        self.install_root.as_deref().map(pacenote_dir)
    }

    /// Switch to a new install root (or none)
    ///
    /// The caller must have stopped the previous watcher already.
    pub fn set_root(&mut self, install_root: Option<PathBuf>) {
        self.sent.reset();
        self.clients.clear_deliveries();
        match &install_root {
            Some(root) => info!("Watching install root {}", root.display()),
            None => info!("No install root configured"),
        }
        self.install_root = install_root;
        self.publish_status();
    }

    /// Apply one watcher event
    pub async fn handle_watch(&mut self, event: WatchEvent) {
        match event {
            WatchEvent::Discovered(path) | WatchEvent::Modified(path) => {
                self.broadcast(&path).await;
            }
            WatchEvent::Removed(path) => {
                if self.sent.remove(&path) {
                    info!("File {} has been removed", path.display());
                    self.publish_status();
                }
            }
        }
    }

    async fn broadcast(&mut self, path: &Path) {
        let Some(root) = self.pacenote_root() else {
            return;
        };
        let Some(relative) = pacenote_relative_path(&root, path) else {
            debug!("Ignoring {} outside of the pacenote folder", path.display());
            return;
        };

        let previously_sent = self.sent.sent_modified(path);
        let current = if previously_sent.is_some() && self.policy.needs_stat() {
            file_store::modified(path).await.ok()
        } else {
            None
        };
        match self.policy.admit(previously_sent, current) {
            Admission::Skip => {
                debug!("{} was already sent", relative);
                return;
            }
            Admission::Redeliver => {
                debug!("{} changed since it was sent", relative);
                self.clients.retract(path);
            }
            Admission::Fresh => {}
        }

        let file = match file_store::read_pacenote(path, relative).await {
            Ok(file) => file,
            Err(e) => {
                warn!("Error reading or parsing file: {}", e);
                return;
            }
        };

        let message = OutboundMessage::file(&file);
        let mut delivered = 0;
        for session in self.clients.sessions_mut() {
            if session.has_delivered(path) {
                continue;
            }
            if deliver(&self.transport, session.conn(), &message) {
                session.mark_delivered(path);
                delivered += 1;
            }
        }
        info!("Sent {} to {} devices", file.relative_path, delivered);

        self.sent.mark_sent(path, file.modified);
        self.publish_status();
    }

    /// Register a device and resend the full file set to it
    pub async fn identify(&mut self, device_id: &str, conn: ConnectionId) {
        self.clients.identify(device_id, conn);
        info!("Device connected: {}", device_id);
        self.publish_status();

        let Some(root) = self.pacenote_root() else {
            debug!("No install root; nothing to resend to {}", device_id);
            return;
        };

        let mut resent = 0;

        // Current directory contents
        match tokio::fs::read_dir(&root).await {
            Ok(mut entries) => loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => {
                        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
                        if !is_file {
                            continue;
                        }
                        let path = entry.path();
                        if self.resend(device_id, &root, &path).await {
                            resent += 1;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Error reading directory {}: {}", root.display(), e);
                        break;
                    }
                }
            },
            Err(e) => warn!("Error reading directory {}: {}", root.display(), e),
        }

        // Previously broadcast files the listing did not cover
        let sent: Vec<PathBuf> = self.sent.all().map(Path::to_path_buf).collect();
        for path in sent {
            if self.resend(device_id, &root, &path).await {
                resent += 1;
            }
        }

        info!("Resent {} files to {}", resent, device_id);
    }

    /// Push one file to one device unless it already has it
    async fn resend(&mut self, device_id: &str, root: &Path, path: &Path) -> bool {
        if self.clients.delivered(device_id, path) {
            return false;
        }
        let Some(relative) = pacenote_relative_path(root, path) else {
            return false;
        };

        let file = match file_store::read_pacenote(path, relative).await {
            Ok(file) => file,
            Err(e) if e.is_not_found() => {
                debug!("Skipping vanished file {}", path.display());
                return false;
            }
            Err(e) => {
                warn!("Error reading or parsing file: {}", e);
                return false;
            }
        };

        let Some(session) = self.clients.lookup_mut(device_id) else {
            return false;
        };
        if !deliver(&self.transport, session.conn(), &OutboundMessage::file(&file)) {
            return false;
        }
        session.mark_delivered(path)
    }

    /// Forget every session bound to a closed connection
    pub fn disconnect(&mut self, conn: ConnectionId) {
        if self.drag_requester == Some(conn) {
            self.drag_requester = None;
        }
        let removed = self.clients.forget(conn);
        for device_id in &removed {
            info!("Device disconnected: {}", device_id);
        }
        if !removed.is_empty() {
            self.publish_status();
        }
    }

    /// Route one text frame from a connection
    pub async fn handle_text(&mut self, conn: ConnectionId, text: &str) {
        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Error parsing message from {}: {}", conn, e);
                return;
            }
        };

        match message {
            InboundMessage::ShowDragArea => {
                self.drag_requester = Some(conn);
                self.emit(ShellEvent::SwitchMode(ShellMode::DragDrop));
            }
            InboundMessage::StageTimes(request) => self.answer_stage_times(conn, request).await,
            InboundMessage::Identify { device_id } => self.identify(&device_id, conn).await,
            InboundMessage::Unrecognized => {
                debug!("Received unrecognized message from {}", conn);
            }
        }
    }

    async fn answer_stage_times(
        &mut self,
        conn: ConnectionId,
        request: Option<StageTimesRequest>,
    ) {
        let reply = match (request, self.install_root.clone()) {
            (None, _) | (_, None) => StageTimesReply::Unavailable,
            (Some(request), Some(root)) => {
                let query = Arc::clone(&self.query);
                match tokio::task::spawn_blocking(move || query.stage_times(&request, &root)).await
                {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!("Stage time query failed: {}", e);
                        StageTimesReply::Unavailable
                    }
                }
            }
        };
        deliver(&self.transport, conn, &OutboundMessage::stage_times(reply));
    }

    /// Relay a file dropped on the shell to the device that asked for it
    pub async fn relay_dropped_file(&mut self, path: &Path) {
        let content = match file_store::read_text(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Error reading dropped file: {}", e);
                return;
            }
        };

        match self.drag_requester {
            Some(conn) => {
                deliver(&self.transport, conn, &OutboundMessage::file_content(content));
            }
            None => debug!("No device is waiting for a dropped file"),
        }
        self.emit(ShellEvent::SwitchMode(ShellMode::Normal));
    }

    /// Return the shell to its normal view without relaying anything
    pub fn leave_drag_area(&mut self) {
        self.emit(ShellEvent::SwitchMode(ShellMode::Normal));
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            folder_path: self.install_root.clone(),
            ws_url: self.ws_url.clone(),
            connected_devices: self.clients.device_ids(),
            sent_files: self.sent.all().map(Path::to_path_buf).collect(),
        }
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.status());
    }

    fn emit(&self, event: ShellEvent) {
        if self.shell_tx.send(event).is_err() {
            debug!("Shell event {:?} dropped, no listener", event);
        }
    }
}

/// Push a message, treating an unavailable connection as a no-op
fn deliver<T: Transport>(transport: &T, conn: ConnectionId, message: &OutboundMessage) -> bool {
    match transport.push(conn, message) {
        Ok(()) => true,
        Err(TransportError::Unavailable(_)) => {
            debug!("Skipping push to closed connection {}", conn);
            false
        }
        Err(e) => {
            warn!("Failed to push to {}: {}", conn, e);
            false
        }
    }
}
