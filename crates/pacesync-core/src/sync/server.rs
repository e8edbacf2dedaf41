//! WebSocket server
//!
//! Accepts device connections and turns them into [`ConnectionEvent`]s for
//! the engine loop. Each connection gets a reader (this task) and a writer
//! task that drains the connection's outbox into the socket.

use std::net::{IpAddr, SocketAddr, UdpSocket};

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::transport::{ConnectionId, Outbox};

/// Connection lifecycle as seen by the engine
#[derive(Debug)]
pub enum ConnectionEvent {
    /// Handshake completed; pushes go through `outbox`
    Opened { conn: ConnectionId, outbox: Outbox },
    /// A text frame arrived
    Inbound { conn: ConnectionId, text: String },
    /// The socket closed or failed
    Closed { conn: ConnectionId },
}

/// Bind the listening socket
pub async fn bind(addr: &str, port: u16) -> Result<TcpListener> {
    let listener = TcpListener::bind((addr, port))
        .await
        .with_context(|| format!("Failed to listen on {}:{}", addr, port))?;
    info!("WebSocket server listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept connections until the engine stops listening
pub async fn serve(listener: TcpListener, events: mpsc::UnboundedSender<ConnectionEvent>) {
    let mut next_id = 0u64;
    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = events.closed() => break,
        };
        let (stream, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        next_id += 1;
        let conn = ConnectionId::new(next_id);
        tokio::spawn(handle_connection(stream, peer, conn, events.clone()));
    }
    debug!("WebSocket server stopped");
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    conn: ConnectionId,
    events: mpsc::UnboundedSender<ConnectionEvent>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        }
    };
    debug!("{} opened from {}", conn, peer);

    let (mut write, mut read) = ws_stream.split();
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<String>();
    if events.send(ConnectionEvent::Opened { conn, outbox }).is_err() {
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(text) = outbox_rx.recv().await {
            if let Err(e) = write.send(Message::Text(text)).await {
                debug!("Write to {} failed: {}", conn, e);
                break;
            }
        }
    });

    while let Some(frame) = read.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(_) => {
                    debug!("Ignoring non-UTF-8 binary frame from {}", conn);
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("Read from {} failed: {}", conn, e);
                break;
            }
        };
        if events.send(ConnectionEvent::Inbound { conn, text }).is_err() {
            break;
        }
    }

    let _ = events.send(ConnectionEvent::Closed { conn });
    writer.abort();
    debug!("{} closed", conn);
}

/// First non-loopback IPv4 address of this machine, if any
pub fn local_ip() -> Option<IpAddr> {
    // No packet is sent; connecting only selects the outbound interface.
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_loopback() && !ip.is_unspecified()).then_some(ip)
}

/// Address devices should connect to
pub fn ws_url(port: u16) -> String {
    match local_ip() {
        Some(ip) => format!("ws://{}:{}", ip, port),
        None => format!("ws://localhost:{}", port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::connect_async;

    #[test]
    fn test_ws_url_shape() {
        let url = ws_url(8080);
        assert!(url.starts_with("ws://"));
        assert!(url.ends_with(":8080"));
    }

    #[tokio::test]
    async fn test_connection_lifecycle() {
        let listener = bind("127.0.0.1", 0).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(serve(listener, tx));

        let (mut client, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        let ConnectionEvent::Opened { conn, outbox } = rx.recv().await.unwrap() else {
            panic!("Expected Opened");
        };

        client
            .send(Message::Text(r#"{"deviceId":"phone"}"#.to_string()))
            .await
            .unwrap();
        match rx.recv().await.unwrap() {
            ConnectionEvent::Inbound { conn: from, text } => {
                assert_eq!(from, conn);
                assert_eq!(text, r#"{"deviceId":"phone"}"#);
            }
            other => panic!("Expected Inbound, got {:?}", other),
        }

        outbox.send("hello".to_string()).unwrap();
        let frame = client.next().await.unwrap().unwrap();
        assert_eq!(frame, Message::Text("hello".to_string()));

        client.close(None).await.unwrap();
        loop {
            match rx.recv().await.unwrap() {
                ConnectionEvent::Closed { conn: closed } => {
                    assert_eq!(closed, conn);
                    break;
                }
                ConnectionEvent::Inbound { .. } => continue,
                other => panic!("Unexpected event {:?}", other),
            }
        }
    }
}
