//! Message types of the remote-control protocol.
//!
//! Every frame on the wire is a JSON object of the shape
//! `{"op": <opcode>, "d": {...}}`.  The `op` field tags the message kind and
//! `d` carries the kind-specific data.  Field names inside `d` are camelCase.
//!
//! Only the handshake messages and the hotkey request are modelled in full;
//! replies and events arriving after the handshake are classified by
//! [`InboundMessage`] for logging and otherwise ignored.

use serde::Deserialize;
use uuid::Uuid;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Event-subscription bitmask announced in every Identify message.
///
/// Kept as an opaque value: the agent never consumes events, it only echoes
/// the interest set the remote application has always been given.
pub const EVENT_SUBSCRIPTIONS: u32 = 33;

/// Request kind used for every command the agent sends.
pub const TRIGGER_HOTKEY_REQUEST: &str = "TriggerHotkeyByName";

// ── Operation codes ───────────────────────────────────────────────────────────

/// Operation codes carried in the `op` field of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Peer → agent: first frame on a new connection.
    Hello = 0,
    /// Agent → peer: answer to Hello.
    Identify = 1,
    /// Peer → agent: identification accepted.
    Identified = 2,
    /// Agent → peer: update subscriptions after identification (unused).
    Reidentify = 3,
    /// Peer → agent: subscribed event notification.
    Event = 5,
    /// Agent → peer: request the peer perform an action.
    Request = 6,
    /// Peer → agent: result of a previous request.
    RequestResponse = 7,
}

impl OpCode {
    /// Returns the numeric value written on the wire.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u64> for OpCode {
    type Error = ();

    fn try_from(value: u64) -> Result<Self, ()> {
        match value {
            0 => Ok(OpCode::Hello),
            1 => Ok(OpCode::Identify),
            2 => Ok(OpCode::Identified),
            3 => Ok(OpCode::Reidentify),
            5 => Ok(OpCode::Event),
            6 => Ok(OpCode::Request),
            7 => Ok(OpCode::RequestResponse),
            _ => Err(()),
        }
    }
}

// ── Handshake messages ────────────────────────────────────────────────────────

/// Hello (op 0): the peer's announcement on a fresh connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloMessage {
    /// Version string of the peer's control plugin, if it sent one.
    #[serde(default)]
    pub obs_web_socket_version: Option<String>,
    /// RPC version offered by the peer.
    pub rpc_version: u32,
}

/// Identify (op 1): the agent's reply to Hello.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifyMessage {
    /// RPC version the agent will use; echoes the peer's offer.
    pub rpc_version: u32,
    /// Bitmask of event categories to receive.
    pub event_subscriptions: u32,
}

impl IdentifyMessage {
    /// Builds the Identify reply for a received Hello.
    ///
    /// The offered RPC version is echoed back and the subscription mask is the
    /// fixed [`EVENT_SUBSCRIPTIONS`] value.
    pub fn answering(hello: &HelloMessage) -> Self {
        Self {
            rpc_version: hello.rpc_version,
            event_subscriptions: EVENT_SUBSCRIPTIONS,
        }
    }
}

/// Identified (op 2): the peer accepted the identification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifiedMessage {
    /// RPC version both sides will speak for the rest of the connection.
    pub negotiated_rpc_version: u32,
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Request (op 6) asking the peer to trigger a hotkey by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMessage {
    /// Request kind; always [`TRIGGER_HOTKEY_REQUEST`] for messages built here.
    pub request_type: String,
    /// Unique id so a reply can be correlated with its request.
    pub request_id: Uuid,
    /// Name of the hotkey to trigger, e.g. `"Move Camera Left"`.
    pub hotkey_name: String,
}

impl CommandMessage {
    /// Builds a hotkey request with a freshly generated request id.
    pub fn trigger_hotkey(hotkey_name: impl Into<String>) -> Self {
        Self {
            request_type: TRIGGER_HOTKEY_REQUEST.to_string(),
            request_id: Uuid::new_v4(),
            hotkey_name: hotkey_name.into(),
        }
    }
}

// ── Post-handshake traffic ────────────────────────────────────────────────────

/// Status block of a RequestResponse.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestStatus {
    /// `true` when the peer executed the request.
    pub result: bool,
    /// Numeric status code reported by the peer.
    pub code: u32,
    /// Optional human-readable explanation for a failure.
    #[serde(default)]
    pub comment: Option<String>,
}

/// A frame received after the handshake completed.
///
/// The agent never acts on these; they are classified so the reader task can
/// log something meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Reply to a previously sent request.
    RequestResponse {
        /// Kind of the original request.
        request_type: String,
        /// Id of the original request.
        request_id: String,
        /// Outcome reported by the peer.
        status: RequestStatus,
    },
    /// Subscribed event notification.
    Event {
        /// Event name as reported by the peer.
        event_type: String,
    },
    /// Any other well-formed frame, identified only by its op code.
    Other {
        /// Raw op code value.
        op: u64,
    },
}
