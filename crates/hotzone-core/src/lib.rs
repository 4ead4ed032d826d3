//! # hotzone-core
//!
//! Shared library for the hotzone agent containing the remote-control wire
//! protocol, the session state machine vocabulary, and the pointer-zone
//! geometry.
//!
//! This crate has zero dependencies on sockets, async runtimes, or OS APIs.
//!
//! # What does hotzone do?
//!
//! The agent watches where the mouse pointer is on a multi-monitor desktop.
//! When the pointer enters the left or right edge band of one designated
//! monitor, the agent asks a remote application (a streaming studio that
//! speaks a JSON-over-WebSocket control protocol) to trigger a named hotkey,
//! for example "Move Camera Right".
//!
//! - **`protocol`** – The JSON messages exchanged with the remote application
//!   and the codec that translates them to and from text frames.
//!
//! - **`domain`** – Pure logic: the monitor region table, the dead-zone and
//!   hysteresis rules that decide when a zone crossing fires, and the states a
//!   session moves through during the handshake.

pub mod domain;
pub mod protocol;

pub use domain::regions::{Region, RegionError, RegionHit, RegionTable};
pub use domain::session::{SessionState, TransitionError};
pub use domain::zones::{MotionFilter, ZoneCrossing, ZoneLatch, ZoneThresholds};
pub use protocol::codec::{
    decode_hello, decode_identified, decode_inbound, encode_command, encode_identify, DecodeError,
};
pub use protocol::messages::{
    CommandMessage, HelloMessage, IdentifiedMessage, IdentifyMessage, InboundMessage, OpCode,
};
