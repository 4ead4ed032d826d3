//! hotzone-agent library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # How the agent is put together
//!
//! Two loops run side by side and share one [`SessionManager`]:
//!
//! 1. The **reconnect supervisor** (an async task) checks once per poll
//!    interval whether the studio session is ready.  When it is not, it
//!    discards the old connection, opens a new WebSocket, and performs the
//!    Hello / Identify / Identified handshake.
//! 2. The **zone monitor** (a dedicated OS thread) samples the pointer,
//!    resolves it to a monitor region, and when the pointer enters the left
//!    or right edge band of the trigger region sends a
//!    `TriggerHotkeyByName` request through the session.  If no session is
//!    ready the request is dropped.
//!
//! [`SessionManager`]: application::session_manager::SessionManager

/// Application layer: session lifecycle, reconnect policy, and zone logic.
pub mod application;

/// Infrastructure layer: WebSocket transport, pointer sources, and config.
pub mod infrastructure;
