//! Transport seam: the Connection Handle abstraction.
//!
//! The session manager talks to the remote studio only through these two
//! traits.  Production code plugs in the WebSocket adapter from
//! `infrastructure::websocket`; tests plug in the in-memory adapter from
//! `infrastructure::mock_transport`.
//!
//! # Contract
//!
//! - [`Connector::open`] resolves only once the transport-level connection is
//!   up (or has failed).
//! - [`ConnectionHandle::send`] fails with [`SendError::NotOpen`] once the
//!   handle has been closed, including when `close` races with the send.
//! - [`ConnectionHandle::receive`] distinguishes an orderly close
//!   ([`ReceiveError::Closed`]) from a transport fault.
//! - [`ConnectionHandle::close`] is idempotent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failure to establish a transport connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The endpoint string could not be used as a connection target.
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The peer refused the connection, the host could not be resolved, or
    /// the upgrade handshake failed.
    #[error("could not reach {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    /// No answer within the connect timeout.
    #[error("timed out after {timeout:?} connecting to {endpoint}")]
    Timeout { endpoint: String, timeout: Duration },
}

/// Failure to write a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The handle was closed before or during the send.
    #[error("connection is not open")]
    NotOpen,

    /// The underlying transport reported an error.
    #[error("transport error while sending: {0}")]
    Transport(String),
}

/// Failure to read a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReceiveError {
    /// The peer closed the connection, or the handle was closed locally.
    #[error("connection closed")]
    Closed,

    /// The underlying transport reported an error.
    #[error("transport error while receiving: {0}")]
    Transport(String),
}

/// Opens connections to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new connection to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] on refusal, resolution failure, or timeout.
    async fn open(&self, endpoint: &str) -> Result<Arc<dyn ConnectionHandle>, ConnectError>;
}

/// One open, message-oriented connection.
///
/// Implementations must be safe to share between the task that drains
/// inbound frames and any number of senders.
#[async_trait]
pub trait ConnectionHandle: Send + Sync {
    /// Sends one text frame.
    ///
    /// # Errors
    ///
    /// [`SendError::NotOpen`] if the handle is closed.
    async fn send(&self, text: String) -> Result<(), SendError>;

    /// Waits for the next text frame.
    ///
    /// # Errors
    ///
    /// [`ReceiveError::Closed`] when the connection is gone.
    async fn receive(&self) -> Result<String, ReceiveError>;

    /// Closes the connection.  Calling it again has no effect.
    async fn close(&self);

    /// Returns `false` once the connection has been closed from either side.
    fn is_open(&self) -> bool;
}
