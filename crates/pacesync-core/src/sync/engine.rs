//! Engine runtime
//!
//! A single event loop owns the dispatcher. Engine commands, connection
//! events and watcher events are handled one at a time, so the registries
//! never see interleaved mutations.
//!
//! ## Usage
//!
//! ```ignore
//! let (engine, handle) = Engine::new(EngineOptions::default(), Arc::new(RaceStatQuery));
//! let listener = server::bind("0.0.0.0", 8080).await?;
//! tokio::spawn(engine.run(listener));
//! handle.set_root(Some(install_root));
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::dispatcher::Dispatcher;
use super::policy::RedeliveryPolicy;
use super::server::{self, ConnectionEvent};
use super::status::{ShellEvent, StatusSnapshot};
use super::transport::ChannelTransport;
use crate::layout::pacenote_dir;
use crate::query::StageTimesQuery;
use crate::watcher::{DirectoryWatcher, RestartPolicy, WatchEvent, WatcherHandle};

/// Settings the engine starts with
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub install_root: Option<PathBuf>,
    pub policy: RedeliveryPolicy,
    pub restart: RestartPolicy,
    pub ws_url: Option<String>,
}

/// Requests from the shell or CLI
#[derive(Debug)]
pub enum EngineCommand {
    SetRoot(Option<PathBuf>),
    FileDropped(PathBuf),
    LeaveDragArea,
    Shutdown,
}

/// Control side of a running engine
#[derive(Debug)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
    status: watch::Receiver<StatusSnapshot>,
    shell_events: Option<mpsc::UnboundedReceiver<ShellEvent>>,
}

impl EngineHandle {
    /// Watch a different install root (or none)
    pub fn set_root(&self, install_root: Option<PathBuf>) -> bool {
        self.send(EngineCommand::SetRoot(install_root))
    }

    /// Relay a file dropped on the shell to the requesting device
    pub fn file_dropped(&self, path: impl Into<PathBuf>) -> bool {
        self.send(EngineCommand::FileDropped(path.into()))
    }

    pub fn leave_drag_area(&self) -> bool {
        self.send(EngineCommand::LeaveDragArea)
    }

    pub fn shutdown(&self) -> bool {
        self.send(EngineCommand::Shutdown)
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.clone()
    }

    /// Take the shell event receiver (can only be called once)
    pub fn take_shell_events(&mut self) -> Option<mpsc::UnboundedReceiver<ShellEvent>> {
        self.shell_events.take()
    }

    fn send(&self, command: EngineCommand) -> bool {
        self.commands.send(command).is_ok()
    }
}

pub struct Engine {
    dispatcher: Dispatcher<ChannelTransport>,
    restart: RestartPolicy,
    commands: mpsc::UnboundedReceiver<EngineCommand>,
    connections_tx: mpsc::UnboundedSender<ConnectionEvent>,
    connections: mpsc::UnboundedReceiver<ConnectionEvent>,
    watcher: Option<WatcherHandle>,
    watch_events: Option<mpsc::UnboundedReceiver<WatchEvent>>,
}

impl Engine {
    pub fn new(options: EngineOptions, query: Arc<dyn StageTimesQuery>) -> (Self, EngineHandle) {
        let mut dispatcher =
            Dispatcher::new(ChannelTransport::new(), query).with_policy(options.policy);
        if let Some(url) = options.ws_url {
            dispatcher = dispatcher.with_ws_url(url);
        }
        dispatcher.set_root(options.install_root);

        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (connections_tx, connections) = mpsc::unbounded_channel();
        let handle = EngineHandle {
            commands: commands_tx,
            status: dispatcher.subscribe_status(),
            shell_events: dispatcher.take_shell_events(),
        };

        let engine = Self {
            dispatcher,
            restart: options.restart,
            commands,
            connections_tx,
            connections,
            watcher: None,
            watch_events: None,
        };
        (engine, handle)
    }

    /// Serve devices on `listener` until shut down
    pub async fn run(mut self, listener: TcpListener) {
        let server = tokio::spawn(server::serve(listener, self.connections_tx.clone()));

        if let Some(root) = self.dispatcher.install_root().map(Path::to_path_buf) {
            self.start_watching(&root);
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(EngineCommand::SetRoot(root)) => self.switch_root(root),
                    Some(EngineCommand::FileDropped(path)) => {
                        self.dispatcher.relay_dropped_file(&path).await;
                    }
                    Some(EngineCommand::LeaveDragArea) => self.dispatcher.leave_drag_area(),
                    Some(EngineCommand::Shutdown) | None => break,
                },
                Some(event) = self.connections.recv() => self.handle_connection(event).await,
                event = next_watch_event(&mut self.watch_events) => match event {
                    Some(event) => self.dispatcher.handle_watch(event).await,
                    None => {
                        warn!("Watcher stopped; file changes are no longer tracked");
                        self.watch_events = None;
                    }
                },
            }
        }

        info!("Shutting down");
        self.stop_watching();
        server.abort();
    }

    async fn handle_connection(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened { conn, outbox } => {
                info!("Client connected ({})", conn);
                self.dispatcher.transport_mut().attach(conn, outbox);
            }
            ConnectionEvent::Inbound { conn, text } => {
                self.dispatcher.handle_text(conn, &text).await;
            }
            ConnectionEvent::Closed { conn } => {
                info!("Client disconnected ({})", conn);
                self.dispatcher.transport_mut().detach(conn);
                self.dispatcher.disconnect(conn);
            }
        }
    }

    fn switch_root(&mut self, install_root: Option<PathBuf>) {
        self.stop_watching();
        self.dispatcher.set_root(install_root.clone());
        if let Some(root) = install_root {
            self.start_watching(&root);
        }
    }

    fn start_watching(&mut self, install_root: &Path) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = DirectoryWatcher::new(pacenote_dir(install_root))
            .with_restart_policy(self.restart)
            .spawn(tx);
        self.watcher = Some(handle);
        self.watch_events = Some(rx);
    }

    /// Stop the current watcher and discard its undelivered events
    fn stop_watching(&mut self) {
        if let Some(handle) = self.watcher.take() {
            debug!("Stopping watcher for {}", handle.root().display());
            handle.stop();
        }
        self.watch_events = None;
    }
}

async fn next_watch_event(rx: &mut Option<mpsc::UnboundedReceiver<WatchEvent>>) -> Option<WatchEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
