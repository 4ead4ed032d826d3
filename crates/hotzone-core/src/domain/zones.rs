//! Trigger-zone detection for a single region.
//!
//! Two pieces of state drive the pointer-zone logic:
//!
//! - [`MotionFilter`] drops samples that moved less than a dead-zone radius
//!   since the last *accepted* sample, so a resting pointer costs nothing.
//! - [`ZoneLatch`] applies hysteresis to the region-relative X coordinate.
//!   A crossing fires once when the pointer enters the left or right zone and
//!   cannot fire again until the pointer has entered the opposite zone.
//!
//! Both are plain values with no I/O; the agent's zone monitor owns them.

use std::fmt;

/// Default left-zone threshold (relative X strictly below this fires).
pub const DEFAULT_LEFT_THRESHOLD: i32 = 250;

/// Default right-zone threshold (relative X at or above this fires).
pub const DEFAULT_RIGHT_THRESHOLD: i32 = 1650;

/// Default dead-zone radius in pixels, applied to both axes.
pub const DEFAULT_DEAD_ZONE: u32 = 5;

/// Relative-X boundaries of the two trigger zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneThresholds {
    /// The left zone is `relative_x < left`.
    pub left: i32,
    /// The right zone is `relative_x >= right`.
    pub right: i32,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            left: DEFAULT_LEFT_THRESHOLD,
            right: DEFAULT_RIGHT_THRESHOLD,
        }
    }
}

/// Which zone the pointer just entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneCrossing {
    /// Entered the left zone.
    Left,
    /// Entered the right zone.
    Right,
}

impl fmt::Display for ZoneCrossing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneCrossing::Left => write!(f, "left"),
            ZoneCrossing::Right => write!(f, "right"),
        }
    }
}

/// Hysteresis latch over the two trigger zones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneLatch {
    left_active: bool,
    right_active: bool,
}

impl ZoneLatch {
    /// Creates a latch with neither zone active.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one region-relative X coordinate through the latch.
    ///
    /// Returns the crossing when the pointer enters a zone whose latch is not
    /// already set.  Entering a zone sets its latch and clears the other one.
    /// Positions between the two zones leave the latch untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hotzone_core::{ZoneCrossing, ZoneLatch, ZoneThresholds};
    ///
    /// let thresholds = ZoneThresholds::default();
    /// let mut latch = ZoneLatch::new();
    ///
    /// assert_eq!(latch.observe(100, &thresholds), Some(ZoneCrossing::Left));
    /// assert_eq!(latch.observe(50, &thresholds), None);
    /// assert_eq!(latch.observe(1700, &thresholds), Some(ZoneCrossing::Right));
    /// ```
    pub fn observe(&mut self, relative_x: i32, thresholds: &ZoneThresholds) -> Option<ZoneCrossing> {
        if relative_x < thresholds.left && !self.left_active {
            self.left_active = true;
            self.right_active = false;
            Some(ZoneCrossing::Left)
        } else if relative_x >= thresholds.right && !self.right_active {
            self.right_active = true;
            self.left_active = false;
            Some(ZoneCrossing::Right)
        } else {
            None
        }
    }

    /// Returns `true` while the left zone has fired and the right has not since.
    pub fn left_active(&self) -> bool {
        self.left_active
    }

    /// Returns `true` while the right zone has fired and the left has not since.
    pub fn right_active(&self) -> bool {
        self.right_active
    }
}

/// Dead-zone filter over absolute pointer positions.
///
/// The reference point only moves when a sample is accepted, so slow drift
/// in steps smaller than the radius is eventually noticed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionFilter {
    dead_zone: u32,
    last: Option<(i32, i32)>,
}

impl MotionFilter {
    /// Creates a filter with the given radius and no reference point.
    pub fn new(dead_zone: u32) -> Self {
        Self {
            dead_zone,
            last: None,
        }
    }

    /// Returns `true` if the position moved beyond the dead zone on at least
    /// one axis, and records it as the new reference point.
    ///
    /// The first sample is always accepted.
    pub fn accept(&mut self, x: i32, y: i32) -> bool {
        if let Some((last_x, last_y)) = self.last {
            if x.abs_diff(last_x) <= self.dead_zone && y.abs_diff(last_y) <= self.dead_zone {
                return false;
            }
        }
        self.last = Some((x, y));
        true
    }

    /// The last accepted position, if any.
    pub fn last(&self) -> Option<(i32, i32)> {
        self.last
    }
}

impl Default for MotionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DEAD_ZONE)
    }
}
