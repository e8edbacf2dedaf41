//! Push transport
//!
//! The dispatcher only ever pushes one message to one connection. Pushes are
//! fire-and-forget: there is no queue limit, no timeout, and a push to a
//! connection that is gone fails with [`TransportError::Unavailable`], which
//! callers treat as a no-op.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc;

use super::message::OutboundMessage;

/// Identifies one accepted connection for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Push failures
#[derive(Error, Debug)]
pub enum TransportError {
    /// The connection is closed or was never attached
    #[error("Connection {0} is not open")]
    Unavailable(ConnectionId),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Narrow push interface between the dispatcher and the network
pub trait Transport: Send {
    fn push(&self, conn: ConnectionId, message: &OutboundMessage) -> Result<(), TransportError>;
}

/// Sender half feeding a connection's socket writer with JSON text
pub type Outbox = mpsc::UnboundedSender<String>;

/// Transport that hands serialized messages to per-connection writer tasks
#[derive(Debug, Default)]
pub struct ChannelTransport {
    outboxes: HashMap<ConnectionId, Outbox>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the outbox of a newly accepted connection
    pub fn attach(&mut self, conn: ConnectionId, outbox: Outbox) {
        self.outboxes.insert(conn, outbox);
    }

    /// Forget a closed connection
    pub fn detach(&mut self, conn: ConnectionId) -> bool {
        self.outboxes.remove(&conn).is_some()
    }

    pub fn is_open(&self, conn: ConnectionId) -> bool {
        self.outboxes
            .get(&conn)
            .is_some_and(|outbox| !outbox.is_closed())
    }

    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }
}

impl Transport for ChannelTransport {
    fn push(&self, conn: ConnectionId, message: &OutboundMessage) -> Result<(), TransportError> {
        let outbox = self
            .outboxes
            .get(&conn)
            .ok_or(TransportError::Unavailable(conn))?;
        let text = message.encode()?;
        outbox
            .send(text)
            .map_err(|_| TransportError::Unavailable(conn))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::StageTimesReply;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
        assert_eq!(ConnectionId::new(7).get(), 7);
    }

    #[test]
    fn test_push_to_attached_connection() {
        let mut transport = ChannelTransport::new();
        let conn = ConnectionId::new(1);
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.attach(conn, tx);

        transport
            .push(conn, &OutboundMessage::stage_times(StageTimesReply::Unavailable))
            .unwrap();

        assert_eq!(rx.try_recv().unwrap(), r#"{"type":"stageTimes","data":null}"#);
        assert!(transport.is_open(conn));
    }

    #[test]
    fn test_push_to_unknown_connection_is_unavailable() {
        let transport = ChannelTransport::new();
        let err = transport
            .push(ConnectionId::new(9), &OutboundMessage::file_content("x".into()))
            .unwrap_err();

        assert!(matches!(err, TransportError::Unavailable(_)));
    }

    #[test]
    fn test_push_after_writer_gone_is_unavailable() {
        let mut transport = ChannelTransport::new();
        let conn = ConnectionId::new(2);
        let (tx, rx) = mpsc::unbounded_channel();
        transport.attach(conn, tx);
        drop(rx);

        assert!(!transport.is_open(conn));
        assert!(matches!(
            transport.push(conn, &OutboundMessage::file_content("x".into())),
            Err(TransportError::Unavailable(_))
        ));

        assert!(transport.detach(conn));
        assert!(transport.is_empty());
    }
}
