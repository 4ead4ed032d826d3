//! WebSocket implementation of the Connection Handle.
//!
//! [`WebSocketConnector`] opens a client connection with
//! `tokio_tungstenite::connect_async`, bounded by a connect timeout.  The
//! resulting stream is split so that the reader task and senders never
//! contend for the same lock:
//!
//! - the **sink** half sits behind a `tokio::sync::Mutex`, which serialises
//!   concurrent writers (a WebSocket sink is not safe for interleaved
//!   writes);
//! - the **stream** half sits behind its own mutex and is only ever read by
//!   one task at a time.
//!
//! An `AtomicBool` records whether the handle is open.  `close` flips it
//! first and then takes the sink lock, so a send that is already writing
//! completes and every later send fails with [`SendError::NotOpen`].  A
//! `watch` channel wakes a pending `receive` when the handle is closed
//! locally.
//!
//! A peer Close or a read error only marks the handle as not open.  The
//! first `close` call (guarded by its own `released` flag) closes the sink,
//! which also flushes the Close reply owed to a peer that closed first.
//!
//! # Portability
//!
//! Only `tokio::net` and `tokio-tungstenite` are used, so this module is the
//! same on every platform.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::application::transport::{
    ConnectError, ConnectionHandle, Connector, ReceiveError, SendError,
};

/// Default limit for the TCP connect plus the HTTP upgrade.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ── Connector ─────────────────────────────────────────────────────────────────

/// Opens WebSocket connections.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    /// Creates a connector that gives up after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, endpoint: &str) -> Result<Arc<dyn ConnectionHandle>, ConnectError> {
        let attempt = timeout(self.connect_timeout, connect_async(endpoint))
            .await
            .map_err(|_| ConnectError::Timeout {
                endpoint: endpoint.to_string(),
                timeout: self.connect_timeout,
            })?;

        let (stream, response) = attempt.map_err(|e| classify_connect_error(endpoint, e))?;
        debug!(status = %response.status(), "WebSocket upgrade to {endpoint} complete");

        let handle: Arc<dyn ConnectionHandle> = Arc::new(WebSocketHandle::new(stream));
        Ok(handle)
    }
}

fn classify_connect_error(endpoint: &str, error: WsError) -> ConnectError {
    match &error {
        WsError::Url(_) | WsError::HttpFormat(_) => ConnectError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: error.to_string(),
        },
        _ => ConnectError::Unreachable {
            endpoint: endpoint.to_string(),
            reason: error.to_string(),
        },
    }
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// One open WebSocket connection.
pub struct WebSocketHandle {
    sink: Mutex<SplitSink<WsStream, WsMessage>>,
    stream: Mutex<SplitStream<WsStream>>,
    open: AtomicBool,
    released: AtomicBool,
    closed: watch::Sender<bool>,
}

impl WebSocketHandle {
    fn new(stream: WsStream) -> Self {
        let (sink, stream) = stream.split();
        let (closed, _) = watch::channel(false);
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            open: AtomicBool::new(true),
            released: AtomicBool::new(false),
            closed,
        }
    }

    fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
    }
}

#[async_trait]
impl ConnectionHandle for WebSocketHandle {
    async fn send(&self, text: String) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::NotOpen);
        }
        let mut sink = self.sink.lock().await;
        // Closed while waiting for the lock.
        if !self.is_open() {
            return Err(SendError::NotOpen);
        }
        sink.send(WsMessage::Text(text))
            .await
            .map_err(|e| match e {
                WsError::ConnectionClosed | WsError::AlreadyClosed => SendError::NotOpen,
                other => SendError::Transport(other.to_string()),
            })
    }

    async fn receive(&self) -> Result<String, ReceiveError> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Err(ReceiveError::Closed);
        }

        let mut stream = self.stream.lock().await;
        loop {
            let frame = tokio::select! {
                frame = stream.next() => frame,
                _ = closed.changed() => return Err(ReceiveError::Closed),
            };

            match frame {
                Some(Ok(WsMessage::Text(text))) => return Ok(text),
                Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(text),
                    Err(_) => debug!("ignoring non-UTF-8 binary frame"),
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    debug!(?frame, "peer sent Close");
                    self.mark_closed();
                    return Err(ReceiveError::Closed);
                }
                // tungstenite answers pings itself.
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    self.mark_closed();
                    return Err(ReceiveError::Closed);
                }
                Some(Err(e)) => {
                    self.mark_closed();
                    return Err(ReceiveError::Transport(e.to_string()));
                }
            }
        }
    }

    async fn close(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.mark_closed();
        self.closed.send_replace(true);

        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.close().await {
            debug!("error while closing WebSocket: {e}");
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_non_websocket_scheme_is_reported_as_invalid_endpoint() {
        // Arrange
        let connector = WebSocketConnector::default();

        // Act
        let result = connector.open("http://localhost/").await;

        // Assert
        assert!(matches!(result, Err(ConnectError::InvalidEndpoint { .. })));
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        // Arrange: grab a free port and release it so nothing listens there
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let connector = WebSocketConnector::default();

        // Act
        let result = connector.open(&format!("ws://{addr}")).await;

        // Assert
        assert!(matches!(result, Err(ConnectError::Unreachable { .. })));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Arrange: accept TCP but never answer the upgrade request
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
            drop(socket);
        });
        let connector = WebSocketConnector::new(Duration::from_millis(200));

        // Act
        let result = connector.open(&format!("ws://{addr}")).await;

        // Assert
        assert!(matches!(result, Err(ConnectError::Timeout { .. })));
    }
}
