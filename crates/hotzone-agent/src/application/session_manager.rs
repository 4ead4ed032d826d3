//! Session Manager: one connection, one handshake, gated command sends.
//!
//! # Lifecycle
//!
//! ```text
//! Absent ──► Connecting ──► Handshaking ──► Ready
//!                │                │
//!                └──────┬─────────┘
//!                       ▼
//!                    Failed
//! ```
//!
//! `Ready` and `Failed` are terminal for a session.  [`SessionManager::establish`]
//! always discards the current session (closing its connection) and starts a
//! fresh one with a new generation number; nothing ever moves a session back
//! to `Connecting`.
//!
//! # Sharing
//!
//! All session data lives in a single `tokio::sync::Mutex<SessionSlot>`.
//! Writers replace the slot contents wholesale under the lock.  Senders take
//! an `Arc` snapshot of the connection under the lock and write after
//! releasing it, so a slow write never blocks the supervisor.  If the
//! supervisor closes that connection meanwhile, the write fails cleanly with
//! [`SendError::NotOpen`].
//!
//! After the handshake a per-session reader task drains inbound frames,
//! logs them, and closes the connection when the peer goes away.  That is how
//! a dropped `Ready` session becomes visible to [`SessionManager::is_ready`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use hotzone_core::{
    decode_hello, decode_identified, decode_inbound, encode_command, encode_identify,
    CommandMessage, DecodeError, IdentifyMessage, InboundMessage, SessionState, TransitionError,
};

use crate::application::transport::{
    ConnectError, ConnectionHandle, Connector, ReceiveError, SendError,
};
use crate::application::zone_monitor::CommandSink;

/// Endpoint of the studio's control server on the local machine.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:4455";

/// Upper bound on the whole Hello → Identify → Identified exchange.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// The handshake completed at the transport level but the peer said no.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// The reply to Identify carried a different op code.
    #[error("peer answered Identify with op {op} instead of Identified")]
    Rejected { op: u64 },

    /// The peer did not finish the exchange in time.
    #[error("handshake did not complete within {0:?}")]
    Timeout(Duration),
}

/// Why a session could not be established.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("handshake receive failed: {0}")]
    Receive(#[from] ReceiveError),

    #[error("handshake send failed: {0}")]
    Send(#[from] SendError),

    #[error("invalid handshake frame: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Settings for [`SessionManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// WebSocket URL of the studio, e.g. `ws://localhost:4455`.
    pub endpoint: String,
    /// Deadline for the handshake once the transport is open.
    pub handshake_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// Point-in-time view of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    /// Generation of the current session; 0 before the first attempt.
    pub generation: u64,
    /// Where the session is in its lifecycle.
    pub state: SessionState,
    /// Whether the session's connection is still open.
    pub connection_open: bool,
}

struct SessionSlot {
    generation: u64,
    state: SessionState,
    handle: Option<Arc<dyn ConnectionHandle>>,
    reader: Option<JoinHandle<()>>,
}

impl SessionSlot {
    fn empty(generation: u64) -> Self {
        Self {
            generation,
            state: SessionState::Absent,
            handle: None,
            reader: None,
        }
    }
}

/// Owns the single session with the studio.
pub struct SessionManager {
    connector: Arc<dyn Connector>,
    config: SessionConfig,
    slot: Mutex<SessionSlot>,
    establish_lock: Mutex<()>,
    generations: AtomicU64,
}

impl SessionManager {
    /// Creates a manager with no session.
    pub fn new(connector: Arc<dyn Connector>, config: SessionConfig) -> Self {
        Self {
            connector,
            config,
            slot: Mutex::new(SessionSlot::empty(0)),
            establish_lock: Mutex::new(()),
            generations: AtomicU64::new(0),
        }
    }

    /// The endpoint this manager connects to.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Returns `true` if a handshaken session with an open connection exists.
    pub async fn is_ready(&self) -> bool {
        let slot = self.slot.lock().await;
        slot.state.is_ready() && slot.handle.as_ref().is_some_and(|h| h.is_open())
    }

    /// Returns a snapshot of the current session.
    pub async fn status(&self) -> SessionStatus {
        let slot = self.slot.lock().await;
        SessionStatus {
            generation: slot.generation,
            state: slot.state,
            connection_open: slot.handle.as_ref().is_some_and(|h| h.is_open()),
        }
    }

    /// Discards the current session and establishes a new one.
    ///
    /// Concurrent calls are serialised; each one runs a full attempt.
    /// Returns the negotiated RPC version.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the connection cannot be opened or the
    /// handshake fails.  The session is then left in `Failed` and its
    /// connection is closed.
    pub async fn establish(&self) -> Result<u32, SessionError> {
        let _attempt = self.establish_lock.lock().await;

        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        self.replace_slot(SessionSlot::empty(generation)).await;
        self.advance(generation, SessionState::Connecting).await?;

        let handle = match self.connector.open(&self.config.endpoint).await {
            Ok(handle) => handle,
            Err(e) => {
                self.mark_failed(generation).await;
                return Err(e.into());
            }
        };

        let outcome = match self.advance(generation, SessionState::Handshaking).await {
            Ok(()) => match timeout(self.config.handshake_timeout, handshake(handle.as_ref())).await
            {
                Ok(result) => result,
                Err(_) => Err(HandshakeError::Timeout(self.config.handshake_timeout).into()),
            },
            Err(e) => Err(e),
        };

        let version = match outcome {
            Ok(version) => version,
            Err(e) => {
                handle.close().await;
                self.mark_failed(generation).await;
                return Err(e);
            }
        };

        let mut slot = self.slot.lock().await;
        match slot.state.transition(SessionState::Ready {
            negotiated_rpc_version: version,
        }) {
            Ok(ready) => slot.state = ready,
            Err(e) => {
                drop(slot);
                handle.close().await;
                return Err(e.into());
            }
        }
        slot.reader = Some(tokio::spawn(drain_inbound(Arc::clone(&handle), generation)));
        slot.handle = Some(handle);
        info!(
            generation,
            endpoint = %self.config.endpoint,
            "session established (rpc v{version})"
        );
        Ok(version)
    }

    /// Sends a hotkey request if a session is ready.
    ///
    /// Returns `Ok(false)` without touching any connection when no session is
    /// ready.  A send failure does not fail the session; it is left for the
    /// reader task or the next readiness check to notice.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if the write itself fails.
    pub async fn try_send(&self, hotkey: &str) -> Result<bool, SendError> {
        let handle = {
            let slot = self.slot.lock().await;
            match (&slot.state, &slot.handle) {
                (SessionState::Ready { .. }, Some(handle)) if handle.is_open() => {
                    Arc::clone(handle)
                }
                _ => return Ok(false),
            }
        };

        let command = CommandMessage::trigger_hotkey(hotkey);
        handle.send(encode_command(&command)).await?;
        debug!(request_id = %command.request_id, hotkey, "sent hotkey request");
        Ok(true)
    }

    /// Closes the current session, if any, and leaves the slot empty.
    pub async fn discard(&self) {
        let generation = self.slot.lock().await.generation;
        self.replace_slot(SessionSlot::empty(generation)).await;
    }

    /// Swaps in `next` and tears the previous session down outside the lock.
    async fn replace_slot(&self, next: SessionSlot) {
        let previous = std::mem::replace(&mut *self.slot.lock().await, next);
        if let Some(reader) = previous.reader {
            reader.abort();
        }
        if let Some(handle) = previous.handle {
            debug!(generation = previous.generation, "closing previous session");
            handle.close().await;
        }
    }

    async fn advance(&self, generation: u64, next: SessionState) -> Result<(), SessionError> {
        let mut slot = self.slot.lock().await;
        let from = slot.state;
        slot.state = from.transition(next)?;
        debug!(generation, "session {from} -> {next}");
        Ok(())
    }

    async fn mark_failed(&self, generation: u64) {
        let mut slot = self.slot.lock().await;
        if slot.generation != generation {
            return;
        }
        match slot.state.transition(SessionState::Failed) {
            Ok(failed) => slot.state = failed,
            Err(e) => warn!(generation, "{e}"),
        }
    }
}

#[async_trait]
impl CommandSink for SessionManager {
    async fn try_send(&self, hotkey: &str) -> Result<bool, SendError> {
        SessionManager::try_send(self, hotkey).await
    }
}

/// Runs Hello → Identify → Identified on an open connection.
async fn handshake(handle: &dyn ConnectionHandle) -> Result<u32, SessionError> {
    let hello = decode_hello(&handle.receive().await?)?;
    debug!(
        rpc_version = hello.rpc_version,
        studio_version = hello.obs_web_socket_version.as_deref().unwrap_or("unknown"),
        "received Hello"
    );

    handle
        .send(encode_identify(&IdentifyMessage::answering(&hello)))
        .await?;

    let identified = decode_identified(&handle.receive().await?).map_err(|e| match e {
        DecodeError::UnexpectedOpCode { found, .. } => {
            SessionError::Handshake(HandshakeError::Rejected { op: found })
        }
        other => SessionError::Decode(other),
    })?;
    Ok(identified.negotiated_rpc_version)
}

/// Reads and logs post-handshake traffic until the connection ends.
async fn drain_inbound(handle: Arc<dyn ConnectionHandle>, generation: u64) {
    loop {
        match handle.receive().await {
            Ok(text) => log_inbound(generation, &text),
            Err(ReceiveError::Closed) => {
                info!(generation, "studio closed the session");
                break;
            }
            Err(e) => {
                warn!(generation, "session read failed: {e}");
                break;
            }
        }
    }
    handle.close().await;
}

fn log_inbound(generation: u64, text: &str) {
    match decode_inbound(text) {
        Ok(InboundMessage::RequestResponse {
            request_type,
            request_id,
            status,
        }) => {
            if status.result {
                debug!(generation, %request_id, "{request_type} succeeded");
            } else {
                warn!(
                    generation,
                    %request_id,
                    code = status.code,
                    "{request_type} failed: {}",
                    status.comment.as_deref().unwrap_or("no comment")
                );
            }
        }
        Ok(InboundMessage::Event { event_type }) => debug!(generation, "event {event_type}"),
        Ok(InboundMessage::Other { op }) => debug!(generation, "ignoring frame with op {op}"),
        Err(e) => debug!(generation, "ignoring undecodable frame: {e}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock_transport::{hello_frame, MockConnector, MockHandle};
    use serde_json::Value;

    fn manager_with(connector: &Arc<MockConnector>) -> SessionManager {
        let connector: Arc<dyn Connector> = Arc::clone(connector) as Arc<dyn Connector>;
        SessionManager::new(connector, SessionConfig::default())
    }

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_handshake_sends_single_identify_and_becomes_ready() {
        // Arrange
        let peer = MockHandle::accepting(1);
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(Arc::clone(&peer));
        let manager = manager_with(&connector);

        // Act
        let version = manager.establish().await.unwrap();

        // Assert
        assert_eq!(version, 1);
        let sent = peer.sent();
        assert_eq!(sent.len(), 1);
        let identify = parse(&sent[0]);
        assert_eq!(identify["op"], 1);
        assert_eq!(identify["d"]["rpcVersion"], 1);
        assert_eq!(identify["d"]["eventSubscriptions"], 33);
        assert!(manager.is_ready().await);
        assert_eq!(
            manager.status().await.state,
            SessionState::Ready {
                negotiated_rpc_version: 1
            }
        );
    }

    #[tokio::test]
    async fn test_establish_uses_configured_endpoint() {
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(MockHandle::accepting(1));
        let manager = manager_with(&connector);

        manager.establish().await.unwrap();

        assert_eq!(connector.endpoints(), vec![DEFAULT_ENDPOINT]);
    }

    #[tokio::test]
    async fn test_wrong_op_after_identify_leaves_session_failed() {
        // Arrange: peer answers with op 3
        let peer = MockHandle::new();
        peer.push_inbound(hello_frame(1));
        peer.push_inbound(r#"{"op":3,"d":{"negotiatedRpcVersion":1}}"#);
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(Arc::clone(&peer));
        let manager = manager_with(&connector);

        // Act
        let result = manager.establish().await;

        // Assert
        assert!(matches!(
            result,
            Err(SessionError::Handshake(HandshakeError::Rejected { op: 3 }))
        ));
        assert_eq!(manager.status().await.state, SessionState::Failed);
        assert!(!manager.is_ready().await);
        assert!(!peer.is_open());
        assert_eq!(peer.releases(), 1);
    }

    #[tokio::test]
    async fn test_hello_without_rpc_version_fails_before_identify() {
        let peer = MockHandle::new();
        peer.push_inbound(r#"{"op":0,"d":{"obsWebSocketVersion":"5.0.0"}}"#);
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(Arc::clone(&peer));
        let manager = manager_with(&connector);

        let result = manager.establish().await;

        assert!(matches!(
            result,
            Err(SessionError::Decode(DecodeError::MissingField("d.rpcVersion")))
        ));
        assert!(peer.sent().is_empty());
        assert_eq!(manager.status().await.state, SessionState::Failed);
    }

    #[tokio::test]
    async fn test_refused_connection_leaves_session_failed() {
        let connector = Arc::new(MockConnector::new());
        connector.push_refusal();
        let manager = manager_with(&connector);

        let result = manager.establish().await;

        assert!(matches!(result, Err(SessionError::Connect(_))));
        let status = manager.status().await;
        assert_eq!(status.state, SessionState::Failed);
        assert_eq!(status.generation, 1);
        assert!(!status.connection_open);
    }

    #[tokio::test]
    async fn test_peer_closing_mid_handshake_fails_session() {
        let peer = MockHandle::new();
        peer.push_inbound(hello_frame(1));
        peer.hang_up();
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(Arc::clone(&peer));
        let manager = manager_with(&connector);

        let result = manager.establish().await;

        // The Identify send hits the closed connection first.
        assert!(matches!(result, Err(SessionError::Send(SendError::NotOpen))));
        assert_eq!(manager.status().await.state, SessionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_times_out() {
        // Arrange: connection opens but the peer never says Hello
        let peer = MockHandle::new();
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(Arc::clone(&peer));
        let manager = manager_with(&connector);

        // Act
        let result = manager.establish().await;

        // Assert
        assert!(matches!(
            result,
            Err(SessionError::Handshake(HandshakeError::Timeout(t))) if t == DEFAULT_HANDSHAKE_TIMEOUT
        ));
        assert!(!peer.is_open());
    }

    #[tokio::test]
    async fn test_try_send_without_session_is_silent_no_op() {
        // Arrange
        let connector = Arc::new(MockConnector::new());
        let manager = manager_with(&connector);

        // Act
        let sent = manager.try_send("Move Camera Right").await;

        // Assert
        assert_eq!(sent, Ok(false));
        assert_eq!(connector.attempts(), 0);
        assert_eq!(manager.status().await.state, SessionState::Absent);
    }

    #[tokio::test]
    async fn test_try_send_when_ready_writes_one_command() {
        let peer = MockHandle::accepting(1);
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(Arc::clone(&peer));
        let manager = manager_with(&connector);
        manager.establish().await.unwrap();

        let sent = manager.try_send("Move Camera Left").await;

        assert_eq!(sent, Ok(true));
        let frames = peer.sent();
        assert_eq!(frames.len(), 2);
        let command = parse(&frames[1]);
        assert_eq!(command["op"], 6);
        assert_eq!(command["d"]["requestType"], "TriggerHotkeyByName");
        assert_eq!(command["d"]["requestData"]["hotkeyName"], "Move Camera Left");
    }

    #[tokio::test]
    async fn test_try_send_after_failed_handshake_is_no_op() {
        let peer = MockHandle::new();
        peer.push_inbound(hello_frame(1));
        peer.push_inbound(r#"{"op":3,"d":{}}"#);
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(Arc::clone(&peer));
        let manager = manager_with(&connector);
        let _ = manager.establish().await;

        assert_eq!(manager.try_send("Move Camera Left").await, Ok(false));
        assert_eq!(peer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_send_failure_is_surfaced_without_failing_session() {
        // Arrange
        let peer = MockHandle::accepting(1);
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(Arc::clone(&peer));
        let manager = manager_with(&connector);
        manager.establish().await.unwrap();
        peer.fail_sends(true);

        // Act
        let result = manager.try_send("Move Camera Left").await;

        // Assert
        assert!(matches!(result, Err(SendError::Transport(_))));
        assert!(manager.status().await.state.is_ready());
    }

    #[tokio::test]
    async fn test_peer_hang_up_makes_session_not_ready() {
        let peer = MockHandle::accepting(1);
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(Arc::clone(&peer));
        let manager = manager_with(&connector);
        manager.establish().await.unwrap();

        peer.hang_up();

        assert!(!manager.is_ready().await);
        assert_eq!(manager.try_send("Move Camera Left").await, Ok(false));
    }

    #[tokio::test]
    async fn test_reestablish_closes_previous_connection() {
        // Arrange
        let first = MockHandle::accepting(1);
        let second = MockHandle::accepting(1);
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(Arc::clone(&first));
        connector.push_peer(Arc::clone(&second));
        let manager = manager_with(&connector);
        manager.establish().await.unwrap();

        // Act
        manager.establish().await.unwrap();

        // Assert
        assert!(!first.is_open());
        assert!(second.is_open());
        assert_eq!(manager.status().await.generation, 2);
        manager.try_send("Move Camera Right").await.unwrap();
        assert_eq!(first.sent().len(), 1);
        assert_eq!(second.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_discard_closes_connection_and_resets_state() {
        let peer = MockHandle::accepting(1);
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(Arc::clone(&peer));
        let manager = manager_with(&connector);
        manager.establish().await.unwrap();

        manager.discard().await;
        manager.discard().await;

        assert_eq!(manager.status().await.state, SessionState::Absent);
        assert_eq!(peer.releases(), 1);
    }

    #[tokio::test]
    async fn test_inbound_responses_do_not_disturb_ready_session() {
        let peer = MockHandle::accepting(1);
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(Arc::clone(&peer));
        let manager = manager_with(&connector);
        manager.establish().await.unwrap();

        peer.push_inbound(
            r#"{"op":7,"d":{"requestType":"TriggerHotkeyByName","requestId":"x","requestStatus":{"result":false,"code":600}}}"#,
        );
        peer.push_inbound("not json");
        tokio::task::yield_now().await;

        assert!(manager.is_ready().await);
    }

    #[tokio::test]
    async fn test_concurrent_establish_calls_do_not_overlap() {
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(MockHandle::accepting(1));
        connector.push_peer(MockHandle::accepting(1));
        let manager = Arc::new(manager_with(&connector));

        let (a, b) = tokio::join!(manager.establish(), manager.establish());

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(connector.attempts(), 2);
        assert_eq!(manager.status().await.generation, 2);
        assert!(manager.is_ready().await);
    }
}
