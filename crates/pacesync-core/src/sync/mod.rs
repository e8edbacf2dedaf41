//! Device sync over WebSocket
//!
//! Pushes pacenote files to connected devices and answers their requests.
//!
//! ## Protocol
//!
//! 1. Device connects via WebSocket
//! 2. Device sends `{"deviceId": ..}`
//! 3. Server resends every current pacenote file
//! 4. Server pushes new files as the watcher discovers them
//!
//! Devices may also ask for stage times or for a file to be dropped on the
//! desktop shell; see [`message`].

pub mod dispatcher;
pub mod engine;
pub mod message;
pub mod policy;
pub mod server;
pub mod status;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use engine::{Engine, EngineCommand, EngineHandle, EngineOptions};
pub use message::{FilePush, InboundMessage, OutboundMessage, ReplyMessage};
pub use policy::{Admission, RedeliveryPolicy};
pub use server::ConnectionEvent;
pub use status::{ShellEvent, ShellMode, StatusSnapshot};
pub use transport::{ChannelTransport, ConnectionId, Outbox, Transport, TransportError};
