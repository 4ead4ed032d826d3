//! In-memory transport for tests.
//!
//! [`MockHandle`] plays the remote peer: tests queue the frames the peer
//! "sends" with [`MockHandle::push_inbound`] and inspect what the agent wrote
//! with [`MockHandle::sent`].  [`MockConnector`] hands out scripted handles
//! or refusals in order, counting every attempt.
//!
//! Like the other mock adapters this module is always compiled so that
//! integration tests under `tests/` can use it too.
//!
//! # Usage in tests
//!
//! ```ignore
//! let peer = MockHandle::accepting(1);
//! let connector = Arc::new(MockConnector::new());
//! connector.push_peer(Arc::clone(&peer));
//!
//! let manager = SessionManager::new(connector, SessionConfig::default());
//! manager.establish().await?;
//!
//! assert_eq!(peer.sent().len(), 1); // the Identify reply
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use crate::application::transport::{
    ConnectError, ConnectionHandle, Connector, ReceiveError, SendError,
};

// ── MockHandle ────────────────────────────────────────────────────────────────

/// Scriptable in-memory connection.
pub struct MockHandle {
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    sent: Mutex<Vec<String>>,
    open: AtomicBool,
    fail_sends: AtomicBool,
    close_calls: AtomicUsize,
    releases: AtomicUsize,
}

impl MockHandle {
    /// Creates an open handle with nothing queued.
    pub fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: tokio::sync::Mutex::new(rx),
            sent: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
            fail_sends: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        })
    }

    /// Creates a handle whose peer completes the handshake at `rpc_version`.
    pub fn accepting(rpc_version: u32) -> Arc<Self> {
        let handle = Self::new();
        handle.push_inbound(hello_frame(rpc_version));
        handle.push_inbound(identified_frame(rpc_version));
        handle
    }

    /// Queues a frame for the next `receive`.
    pub fn push_inbound(&self, text: impl Into<String>) {
        if let Some(tx) = lock(&self.inbound_tx).as_ref() {
            let _ = tx.send(text.into());
        }
    }

    /// Simulates the peer dropping the connection.
    ///
    /// Already queued frames are still delivered; after that `receive`
    /// reports [`ReceiveError::Closed`].
    pub fn hang_up(&self) {
        self.open.store(false, Ordering::SeqCst);
        lock(&self.inbound_tx).take();
    }

    /// Makes every following `send` fail with a transport error.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Every frame the agent has sent, in order.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    /// How many times `close` was called.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// How many times `close` actually released the connection.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionHandle for MockHandle {
    async fn send(&self, text: String) -> Result<(), SendError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(SendError::NotOpen);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SendError::Transport("mock send failure".to_string()));
        }
        lock(&self.sent).push(text);
        Ok(())
    }

    async fn receive(&self) -> Result<String, ReceiveError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or(ReceiveError::Closed)
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.open.swap(false, Ordering::SeqCst) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
        // Wakes a pending receive.
        lock(&self.inbound_tx).take();
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

// ── MockConnector ─────────────────────────────────────────────────────────────

/// Connector that replays a script of peers and refusals.
///
/// Once the script is exhausted every attempt is refused.
#[derive(Default)]
pub struct MockConnector {
    script: Mutex<VecDeque<Result<Arc<MockHandle>, ConnectError>>>,
    endpoints: Mutex<Vec<String>>,
}

impl MockConnector {
    /// Creates a connector with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a peer for the next attempt.
    pub fn push_peer(&self, handle: Arc<MockHandle>) {
        lock(&self.script).push_back(Ok(handle));
    }

    /// Queues a refused attempt.
    pub fn push_refusal(&self) {
        lock(&self.script).push_back(Err(ConnectError::Unreachable {
            endpoint: "mock".to_string(),
            reason: "connection refused".to_string(),
        }));
    }

    /// Number of `open` calls so far.
    pub fn attempts(&self) -> usize {
        lock(&self.endpoints).len()
    }

    /// Endpoints passed to `open`, in order.
    pub fn endpoints(&self) -> Vec<String> {
        lock(&self.endpoints).clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, endpoint: &str) -> Result<Arc<dyn ConnectionHandle>, ConnectError> {
        lock(&self.endpoints).push(endpoint.to_string());
        let next = lock(&self.script).pop_front();
        match next {
            Some(Ok(handle)) => {
                let handle: Arc<dyn ConnectionHandle> = handle;
                Ok(handle)
            }
            Some(Err(e)) => Err(e),
            None => Err(ConnectError::Unreachable {
                endpoint: endpoint.to_string(),
                reason: "no scripted peer".to_string(),
            }),
        }
    }
}

// ── Frame builders ────────────────────────────────────────────────────────────

/// A Hello frame as the studio sends it.
pub fn hello_frame(rpc_version: u32) -> String {
    json!({
        "op": 0,
        "d": { "obsWebSocketVersion": "5.0.0", "rpcVersion": rpc_version },
    })
    .to_string()
}

/// An Identified frame accepting the session at `rpc_version`.
pub fn identified_frame(rpc_version: u32) -> String {
    json!({ "op": 2, "d": { "negotiatedRpcVersion": rpc_version } }).to_string()
}

/// Mutex poisoning only happens after a panic in a test; recover the data.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_close_is_idempotent() {
        // Arrange
        let handle = MockHandle::new();

        // Act
        handle.close().await;
        handle.close().await;

        // Assert
        assert_eq!(handle.close_calls(), 2);
        assert_eq!(handle.releases(), 1);
        assert!(!handle.is_open());
    }

    #[tokio::test]
    async fn test_send_after_close_is_not_open() {
        let handle = MockHandle::new();
        handle.close().await;

        let result = handle.send("x".to_string()).await;

        assert_eq!(result, Err(SendError::NotOpen));
        assert!(handle.sent().is_empty());
    }

    #[tokio::test]
    async fn test_receive_after_hang_up_drains_then_reports_closed() {
        let handle = MockHandle::new();
        handle.push_inbound("first");
        handle.hang_up();

        assert_eq!(handle.receive().await, Ok("first".to_string()));
        assert_eq!(handle.receive().await, Err(ReceiveError::Closed));
    }

    #[tokio::test]
    async fn test_close_wakes_pending_receive() {
        let handle = MockHandle::new();
        let reader = {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move { handle.receive().await })
        };
        tokio::task::yield_now().await;

        handle.close().await;

        assert_eq!(reader.await.unwrap(), Err(ReceiveError::Closed));
    }

    #[tokio::test]
    async fn test_connector_replays_script_then_refuses() {
        // Arrange
        let connector = MockConnector::new();
        connector.push_refusal();
        connector.push_peer(MockHandle::new());

        // Act
        let first = connector.open("ws://a").await;
        let second = connector.open("ws://b").await;
        let third = connector.open("ws://c").await;

        // Assert
        assert!(first.is_err());
        assert!(second.is_ok());
        assert!(matches!(third, Err(ConnectError::Unreachable { .. })));
        assert_eq!(connector.attempts(), 3);
        assert_eq!(connector.endpoints(), vec!["ws://a", "ws://b", "ws://c"]);
    }
}
