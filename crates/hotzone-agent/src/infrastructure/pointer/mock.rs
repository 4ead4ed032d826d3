//! Scripted pointer source for tests.
//!
//! Replays a fixed list of positions (and failures) in order.  When the
//! script runs out the pointer stays where it was, which is what a resting
//! mouse looks like to the zone monitor.
//!
//! # Usage in tests
//!
//! ```ignore
//! let pointer = ScriptedPointerSource::new([(2420, 500), (2020, 500)]);
//! let mut monitor = ZoneMonitor::new(pointer, RegionTable::default(), config, sink);
//! monitor.sample().await; // relative x 500
//! monitor.sample().await; // relative x 100 → left zone
//! ```

use std::collections::VecDeque;

use crate::application::zone_monitor::{PointerError, PointerSource};

/// A pointer source that replays a script.
#[derive(Debug, Default)]
pub struct ScriptedPointerSource {
    script: VecDeque<Result<(i32, i32), PointerError>>,
    last: Option<(i32, i32)>,
    queries: usize,
}

impl ScriptedPointerSource {
    /// Creates a source that yields `positions` in order.
    pub fn new(positions: impl IntoIterator<Item = (i32, i32)>) -> Self {
        Self {
            script: positions.into_iter().map(Ok).collect(),
            ..Self::default()
        }
    }

    /// Appends a position.
    pub fn push(&mut self, position: (i32, i32)) {
        self.script.push_back(Ok(position));
    }

    /// Appends a failed query.
    pub fn push_failure(&mut self, reason: impl Into<String>) {
        self.script.push_back(Err(PointerError::Query(reason.into())));
    }

    /// Number of queries answered so far.
    pub fn queries(&self) -> usize {
        self.queries
    }
}

impl PointerSource for ScriptedPointerSource {
    fn current_position(&mut self) -> Result<(i32, i32), PointerError> {
        self.queries += 1;
        match self.script.pop_front() {
            Some(Ok(position)) => {
                self.last = Some(position);
                Ok(position)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last
                .ok_or_else(|| PointerError::Unavailable("script is empty".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_script_then_holds_last_position() {
        // Arrange
        let mut source = ScriptedPointerSource::new([(1, 2), (3, 4)]);

        // Act
        let positions: Vec<_> = (0..4).map(|_| source.current_position()).collect();

        // Assert
        assert_eq!(
            positions,
            vec![Ok((1, 2)), Ok((3, 4)), Ok((3, 4)), Ok((3, 4))]
        );
        assert_eq!(source.queries(), 4);
    }

    #[test]
    fn test_failures_are_replayed_in_order() {
        let mut source = ScriptedPointerSource::new([(1, 2)]);
        source.push_failure("gone");
        source.push((5, 6));

        assert_eq!(source.current_position(), Ok((1, 2)));
        assert_eq!(
            source.current_position(),
            Err(PointerError::Query("gone".to_string()))
        );
        assert_eq!(source.current_position(), Ok((5, 6)));
    }

    #[test]
    fn test_empty_script_is_unavailable() {
        let mut source = ScriptedPointerSource::default();
        assert!(matches!(
            source.current_position(),
            Err(PointerError::Unavailable(_))
        ));
    }
}
