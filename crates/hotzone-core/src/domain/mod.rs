//! Domain layer: pure logic with no I/O.
//!
//! - **`session`** – The states a session passes through and which moves are legal.
//! - **`regions`** – The static monitor table and point-to-region resolution.
//! - **`zones`** – Dead-zone filtering and the hysteresis latch for zone crossings.

pub mod regions;
pub mod session;
pub mod zones;
