//! Application layer use cases for the agent.
//!
//! - **`transport`** – The traits the session talks through (`Connector`,
//!   `ConnectionHandle`) and their error types.  Real and mock
//!   implementations live in the infrastructure layer.
//!
//! - **`session_manager`** – Owns the single current session: opens the
//!   connection, runs the handshake, hands out sends, and tears it down.
//!
//! - **`reconnect`** – The background loop that keeps a session ready.
//!
//! - **`zone_monitor`** – Samples the pointer and turns zone crossings into
//!   hotkey requests.

pub mod reconnect;
pub mod session_manager;
pub mod transport;
pub mod zone_monitor;
