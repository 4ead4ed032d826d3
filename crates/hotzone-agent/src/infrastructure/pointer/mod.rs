//! Pointer position sources.
//!
//! Each platform implements [`PointerSource`]; the correct one is selected at
//! compile time via `#[cfg(target_os = ...)]` and re-exported as
//! `NativePointerSource`:
//!
//! | Module  | OS    | API used                                   |
//! |---------|-------|--------------------------------------------|
//! | `linux` | Linux | `XOpenDisplay` + `XQueryPointer` (Xlib)     |
//!
//! A [`ScriptedPointerSource`] is always compiled (not guarded by `#[cfg]`)
//! so tests on any platform can drive the zone monitor without a display.
//!
//! [`PointerSource`]: crate::application::zone_monitor::PointerSource

pub mod mock;

#[cfg(target_os = "linux")]
pub mod linux;

pub use mock::ScriptedPointerSource;

#[cfg(target_os = "linux")]
pub use linux::X11PointerSource as NativePointerSource;
