//! Zone Monitor: turns pointer samples into hotkey requests.
//!
//! Each sample goes through four gates in order:
//!
//! 1. **Pointer query** – a failed query skips the sample.
//! 2. **Dead zone** – a pointer that moved no more than the dead-zone radius
//!    on both axes since the last accepted sample is treated as stationary.
//! 3. **Region lookup** – the first region containing the point wins; only
//!    the designated trigger region runs zone logic.
//! 4. **Hysteresis latch** – fires once on entering the left or right zone.
//!
//! A crossing becomes a best-effort hotkey request through the
//! [`CommandSink`].  When no session is ready the request is dropped and the
//! latch still flips, so the crossing is not replayed later.
//!
//! The loop itself ([`ZoneMonitor::run_blocking`]) runs on a dedicated OS
//! thread because pointer sources such as the X11 display connection are
//! not `Send`.  It enters the Tokio runtime only for the send.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use hotzone_core::domain::zones::DEFAULT_DEAD_ZONE;
use hotzone_core::{MotionFilter, RegionTable, ZoneCrossing, ZoneLatch, ZoneThresholds};

use crate::application::transport::SendError;

/// Region that runs zone logic unless configured otherwise.
pub const DEFAULT_TRIGGER_REGION: &str = "DP3-1";

/// Hotkey requested when the pointer enters the left zone.
pub const DEFAULT_LEFT_ZONE_HOTKEY: &str = "Move Camera Right";

/// Hotkey requested when the pointer enters the right zone.
pub const DEFAULT_RIGHT_ZONE_HOTKEY: &str = "Move Camera Left";

/// Pause between two pointer samples.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Error type for pointer queries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PointerError {
    /// The pointer source could not be opened (e.g. no display).
    #[error("pointer source unavailable: {0}")]
    Unavailable(String),

    /// A single query failed.
    #[error("pointer query failed: {0}")]
    Query(String),
}

/// Synchronous source of absolute pointer positions.
#[cfg_attr(test, mockall::automock)]
pub trait PointerSource {
    /// Returns the pointer's absolute screen coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`PointerError`] when the position cannot be read; the caller
    /// skips that sample.
    fn current_position(&mut self) -> Result<(i32, i32), PointerError>;
}

/// Destination for hotkey requests.
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Requests `hotkey` if a session is ready.
    ///
    /// Returns `Ok(false)` when the request was dropped because no session is
    /// ready.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] when the write fails.
    async fn try_send(&self, hotkey: &str) -> Result<bool, SendError>;
}

/// Settings for [`ZoneMonitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneMonitorConfig {
    /// Name of the only region that runs zone logic.
    pub trigger_region: String,
    /// Relative-X bounds of the two zones.
    pub thresholds: ZoneThresholds,
    /// Dead-zone radius in pixels.
    pub dead_zone: u32,
    /// Hotkey requested on entering the left zone.
    pub left_zone_hotkey: String,
    /// Hotkey requested on entering the right zone.
    pub right_zone_hotkey: String,
    /// Pause between samples in [`ZoneMonitor::run_blocking`].
    pub sample_interval: Duration,
}

impl Default for ZoneMonitorConfig {
    fn default() -> Self {
        Self {
            trigger_region: DEFAULT_TRIGGER_REGION.to_string(),
            thresholds: ZoneThresholds::default(),
            dead_zone: DEFAULT_DEAD_ZONE,
            left_zone_hotkey: DEFAULT_LEFT_ZONE_HOTKEY.to_string(),
            right_zone_hotkey: DEFAULT_RIGHT_ZONE_HOTKEY.to_string(),
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}

/// What a single sample did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    /// The pointer query failed.
    PointerUnavailable,
    /// The pointer stayed inside the dead zone.
    Stationary,
    /// The point lies outside every region.
    Unmapped,
    /// The point lies in a region without zone logic.
    Passive { region: String },
    /// Trigger region, but no crossing.
    Quiet,
    /// A crossing fired; `sent` tells whether the request went out.
    Fired {
        crossing: ZoneCrossing,
        hotkey: String,
        sent: bool,
    },
}

/// Polls a pointer source and fires hotkeys on zone crossings.
pub struct ZoneMonitor<P> {
    pointer: P,
    regions: RegionTable,
    config: ZoneMonitorConfig,
    sink: Arc<dyn CommandSink>,
    filter: MotionFilter,
    latch: ZoneLatch,
    pointer_failing: bool,
}

impl<P: PointerSource> ZoneMonitor<P> {
    /// Creates a monitor with both latches clear and no previous sample.
    pub fn new(
        pointer: P,
        regions: RegionTable,
        config: ZoneMonitorConfig,
        sink: Arc<dyn CommandSink>,
    ) -> Self {
        if regions.get(&config.trigger_region).is_none() {
            warn!(
                "trigger region '{}' is not in the region table; no hotkeys will fire",
                config.trigger_region
            );
        }
        Self {
            filter: MotionFilter::new(config.dead_zone),
            pointer,
            regions,
            config,
            sink,
            latch: ZoneLatch::new(),
            pointer_failing: false,
        }
    }

    /// Current hysteresis latch.
    pub fn latch(&self) -> ZoneLatch {
        self.latch
    }

    /// Takes one sample and acts on it.
    pub async fn sample(&mut self) -> SampleOutcome {
        let (x, y) = match self.pointer.current_position() {
            Ok(position) => {
                if self.pointer_failing {
                    info!("pointer readable again");
                    self.pointer_failing = false;
                }
                position
            }
            Err(e) => {
                if !self.pointer_failing {
                    warn!("skipping pointer samples: {e}");
                    self.pointer_failing = true;
                } else {
                    debug!("skipping pointer sample: {e}");
                }
                return SampleOutcome::PointerUnavailable;
            }
        };

        if !self.filter.accept(x, y) {
            return SampleOutcome::Stationary;
        }

        let relative_x = match self.regions.resolve(x, y) {
            None => return SampleOutcome::Unmapped,
            Some(hit) if hit.region.name != self.config.trigger_region => {
                return SampleOutcome::Passive {
                    region: hit.region.name.clone(),
                }
            }
            Some(hit) => hit.relative_x,
        };

        let Some(crossing) = self.latch.observe(relative_x, &self.config.thresholds) else {
            return SampleOutcome::Quiet;
        };

        let hotkey = match crossing {
            ZoneCrossing::Left => self.config.left_zone_hotkey.clone(),
            ZoneCrossing::Right => self.config.right_zone_hotkey.clone(),
        };

        let sent = match self.sink.try_send(&hotkey).await {
            Ok(true) => {
                info!(%crossing, relative_x, "requested hotkey '{hotkey}'");
                true
            }
            Ok(false) => {
                debug!(%crossing, "no ready session; dropped hotkey '{hotkey}'");
                false
            }
            Err(e) => {
                warn!("failed to send hotkey '{hotkey}': {e}");
                false
            }
        };

        SampleOutcome::Fired {
            crossing,
            hotkey,
            sent,
        }
    }

    /// Samples forever on the calling thread until `running` is cleared.
    ///
    /// Sleeps the calling thread between samples, so call this from a
    /// dedicated thread, never from a runtime worker.
    pub fn run_blocking(mut self, runtime: &Handle, running: &AtomicBool) {
        info!(
            region = %self.config.trigger_region,
            interval = ?self.config.sample_interval,
            "zone monitor started"
        );
        while running.load(Ordering::Relaxed) {
            runtime.block_on(self.sample());
            std::thread::sleep(self.config.sample_interval);
        }
        info!("zone monitor stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
