//! Static monitor region table.
//!
//! The desktop is described as an ordered list of axis-aligned rectangles in
//! absolute screen coordinates, one per monitor.  A pointer position is mapped
//! to the *first* region that contains it, so the table tolerates overlapping
//! entries even though a well-formed desktop has none.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors detected while building a [`RegionTable`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    /// A region was given an empty name.
    #[error("region at index {0} has an empty name")]
    EmptyName(usize),

    /// A region has zero width or height and can never contain a point.
    #[error("region '{0}' has zero width or height")]
    ZeroSize(String),

    /// Two regions share the same name.
    #[error("duplicate region name '{0}'")]
    DuplicateName(String),
}

/// One monitor in absolute screen coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Output name, e.g. `"DP3-1"`.
    pub name: String,
    /// Left edge (inclusive).
    pub x: i32,
    /// Top edge (inclusive).
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Region {
    /// Creates a region.
    pub fn new(name: impl Into<String>, x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    /// Returns `true` if the absolute point lies inside this region.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (i64::from(x), i64::from(y));
        x >= i64::from(self.x) && x < self.right() && y >= i64::from(self.y) && y < self.bottom()
    }

    /// Returns `true` if this region overlaps with `other`.
    pub fn overlaps(&self, other: &Region) -> bool {
        i64::from(self.x) < other.right()
            && self.right() > i64::from(other.x)
            && i64::from(self.y) < other.bottom()
            && self.bottom() > i64::from(other.y)
    }
}

/// The monitor layout of the workstation this agent was written for.
///
/// ```text
/// eDP1   1920x1200 at (0, 0)
/// DP3-1  1920x1080 at (1920, 0)   primary
/// DP3-2  1080x1920 at (3840, 0)   rotated left
/// ```
pub fn default_regions() -> Vec<Region> {
    vec![
        Region::new("eDP1", 0, 0, 1920, 1200),
        Region::new("DP3-1", 1920, 0, 1920, 1080),
        Region::new("DP3-2", 3840, 0, 1080, 1920),
    ]
}

/// A resolved pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionHit<'a> {
    /// The region containing the point.
    pub region: &'a Region,
    /// X offset from the region's left edge.
    pub relative_x: i32,
    /// Y offset from the region's top edge.
    pub relative_y: i32,
}

/// Ordered, immutable list of monitor regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionTable {
    regions: Vec<Region>,
}

impl RegionTable {
    /// Builds a table, validating every entry.
    ///
    /// Overlaps are allowed; see [`RegionTable::overlapping_pairs`].
    ///
    /// # Errors
    ///
    /// Returns [`RegionError`] for empty names, zero-sized regions, or
    /// duplicate names.
    pub fn new(regions: Vec<Region>) -> Result<Self, RegionError> {
        let mut seen = HashSet::new();
        for (index, region) in regions.iter().enumerate() {
            if region.name.is_empty() {
                return Err(RegionError::EmptyName(index));
            }
            if region.width == 0 || region.height == 0 {
                return Err(RegionError::ZeroSize(region.name.clone()));
            }
            if !seen.insert(region.name.as_str()) {
                return Err(RegionError::DuplicateName(region.name.clone()));
            }
        }
        Ok(Self { regions })
    }

    /// Returns the regions in lookup order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Returns the region with the given name.
    pub fn get(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// Maps an absolute point to the first region containing it.
    ///
    /// Returns `None` when the point lies outside every region.
    pub fn resolve(&self, x: i32, y: i32) -> Option<RegionHit<'_>> {
        self.regions
            .iter()
            .find(|r| r.contains(x, y))
            .map(|region| RegionHit {
                region,
                relative_x: x.saturating_sub(region.x),
                relative_y: y.saturating_sub(region.y),
            })
    }

    /// Lists every pair of overlapping regions by name, in table order.
    pub fn overlapping_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        for (i, a) in self.regions.iter().enumerate() {
            for b in &self.regions[i + 1..] {
                if a.overlaps(b) {
                    pairs.push((a.name.as_str(), b.name.as_str()));
                }
            }
        }
        pairs
    }
}

impl Default for RegionTable {
    fn default() -> Self {
        Self {
            regions: default_regions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_on_rotated_monitor_resolves_to_dp3_2() {
        // Arrange
        let table = RegionTable::default();

        // Act
        let hit = table.resolve(3850, 10).expect("point must resolve");

        // Assert
        assert_eq!(hit.region.name, "DP3-2");
        assert_eq!(hit.relative_x, 10);
        assert_eq!(hit.relative_y, 10);
    }

    #[test]
    fn test_point_outside_every_region_resolves_to_none() {
        let table = RegionTable::default();
        assert!(table.resolve(5000, 5000).is_none());
    }

    #[test]
    fn test_right_edge_is_exclusive() {
        let table = RegionTable::default();
        assert_eq!(table.resolve(1919, 0).unwrap().region.name, "eDP1");
        assert_eq!(table.resolve(1920, 0).unwrap().region.name, "DP3-1");
    }

    #[test]
    fn test_bottom_edge_is_exclusive() {
        let table = RegionTable::default();
        // DP3-1 is only 1080 tall.
        assert!(table.resolve(2000, 1080).is_none());
        assert_eq!(table.resolve(2000, 1079).unwrap().region.name, "DP3-1");
    }

    #[test]
    fn test_negative_coordinates_resolve_to_none_in_default_table() {
        let table = RegionTable::default();
        assert!(table.resolve(-1, 10).is_none());
    }

    #[test]
    fn test_overlapping_regions_use_first_match() {
        // Arrange
        let table = RegionTable::new(vec![
            Region::new("first", 0, 0, 100, 100),
            Region::new("second", 50, 50, 100, 100),
        ])
        .unwrap();

        // Act
        let hit = table.resolve(75, 75).unwrap();

        // Assert
        assert_eq!(hit.region.name, "first");
        assert_eq!(table.overlapping_pairs(), vec![("first", "second")]);
    }

    #[test]
    fn test_default_table_has_no_overlaps() {
        assert!(RegionTable::default().overlapping_pairs().is_empty());
    }

    #[test]
    fn test_new_rejects_zero_sized_region() {
        let result = RegionTable::new(vec![Region::new("flat", 0, 0, 100, 0)]);
        assert_eq!(result, Err(RegionError::ZeroSize("flat".to_string())));
    }

    #[test]
    fn test_new_rejects_duplicate_names() {
        let result = RegionTable::new(vec![
            Region::new("DP1", 0, 0, 10, 10),
            Region::new("DP1", 10, 0, 10, 10),
        ]);
        assert_eq!(result, Err(RegionError::DuplicateName("DP1".to_string())));
    }

    #[test]
    fn test_new_rejects_empty_name() {
        let result = RegionTable::new(vec![Region::new("", 0, 0, 10, 10)]);
        assert_eq!(result, Err(RegionError::EmptyName(0)));
    }

    #[test]
    fn test_get_by_name() {
        let table = RegionTable::default();
        assert_eq!(table.get("DP3-1").unwrap().x, 1920);
        assert!(table.get("HDMI-1").is_none());
    }

    #[test]
    fn test_huge_region_does_not_overflow() {
        let region = Region::new("wide", i32::MAX - 1, 0, u32::MAX, 1);
        assert!(region.contains(i32::MAX, 0));
    }
}
