//! Linux pointer source via the X11 Xlib API.
//!
//! Opens one display connection for the lifetime of the source and asks the
//! X server for the pointer position relative to the default root window,
//! which spans every monitor of the screen.  Root coordinates are therefore
//! the absolute desktop coordinates the region table is written in.
//!
//! The display pointer is not thread-safe, so `X11PointerSource` is neither
//! `Send` nor `Sync`; create it on the thread that samples.

use std::os::raw::{c_int, c_uint};
use std::ptr;

use x11::xlib;

use crate::application::zone_monitor::{PointerError, PointerSource};

/// Pointer source backed by `XQueryPointer`.
pub struct X11PointerSource {
    display: *mut xlib::Display,
    root: xlib::Window,
}

impl X11PointerSource {
    /// Connects to the display named by `DISPLAY`.
    ///
    /// # Errors
    ///
    /// Returns [`PointerError::Unavailable`] if the display cannot be opened.
    pub fn open() -> Result<Self, PointerError> {
        // SAFETY: a null name makes Xlib read DISPLAY.  The returned pointer
        // is released by XCloseDisplay in Drop.
        let display = unsafe { xlib::XOpenDisplay(ptr::null()) };

        if display.is_null() {
            let display_env = std::env::var("DISPLAY").unwrap_or_else(|_| "<unset>".to_string());
            return Err(PointerError::Unavailable(format!(
                "XOpenDisplay failed; DISPLAY={display_env}"
            )));
        }

        // SAFETY: `display` is a valid non-null pointer returned by XOpenDisplay.
        let root = unsafe { xlib::XDefaultRootWindow(display) };

        Ok(Self { display, root })
    }
}

impl PointerSource for X11PointerSource {
    fn current_position(&mut self) -> Result<(i32, i32), PointerError> {
        let mut root_return: xlib::Window = 0;
        let mut child_return: xlib::Window = 0;
        let (mut root_x, mut root_y): (c_int, c_int) = (0, 0);
        let (mut win_x, mut win_y): (c_int, c_int) = (0, 0);
        let mut mask: c_uint = 0;

        // SAFETY: `display` stays valid until Drop; every out-pointer refers
        // to a live local.
        let on_screen = unsafe {
            xlib::XQueryPointer(
                self.display,
                self.root,
                &mut root_return,
                &mut child_return,
                &mut root_x,
                &mut root_y,
                &mut win_x,
                &mut win_y,
                &mut mask,
            )
        };

        if on_screen == xlib::False {
            return Err(PointerError::Query(
                "XQueryPointer: pointer is not on the default screen".to_string(),
            ));
        }

        Ok((root_x, root_y))
    }
}

impl Drop for X11PointerSource {
    fn drop(&mut self) {
        // SAFETY: `display` was opened in `open` and is not used after this.
        unsafe { xlib::XCloseDisplay(self.display) };
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
