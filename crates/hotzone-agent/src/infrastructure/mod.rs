//! Infrastructure layer: adapters that touch the OS or the network.
//!
//! - **`websocket`** – `tokio-tungstenite` implementation of the transport traits.
//! - **`mock_transport`** – Scripted in-memory transport for tests.
//! - **`pointer`** – Pointer position sources (X11 on Linux, scripted for tests).
//! - **`config`** – TOML configuration file.

pub mod config;
pub mod mock_transport;
pub mod pointer;
pub mod websocket;
