//! Timeline partitioning: cut markers to gapless segment ranges

use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::TimeRange;

/// Shortest range the partitioner will emit, in seconds
pub const DEFAULT_MIN_SEGMENT: f64 = 0.01;

/// Turns a duration and a set of cut markers into consecutive ranges
#[derive(Debug, Clone, Copy)]
pub struct TimelinePartitioner {
    min_segment: f64,
}

impl Default for TimelinePartitioner {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SEGMENT)
    }
}

impl TimelinePartitioner {
    pub fn new(min_segment: f64) -> Self {
        Self {
            min_segment: if min_segment.is_finite() && min_segment > 0.0 {
                min_segment
            } else {
                DEFAULT_MIN_SEGMENT
            },
        }
    }

    pub fn min_segment(&self) -> f64 {
        self.min_segment
    }

    /// Partition `[0, duration]` at `markers`.
    ///
    /// Markers outside `(0, duration)` are discarded, the rest are sorted and
    /// deduplicated. A marker that would leave a range shorter than the minimum
    /// segment on either side is dropped, which folds the would-be sliver into
    /// its neighbour. The result always starts at 0, ends at `duration` and has
    /// no gaps. When `duration` itself is below the minimum the single range
    /// `[0, duration]` is returned.
    pub fn partition(&self, duration: f64, markers: &[f64]) -> DomainResult<Vec<TimeRange>> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "Duration must be positive, got {}",
                duration
            )));
        }
        if let Some(bad) = markers.iter().find(|m| !m.is_finite()) {
            return Err(DomainError::InvalidInput(format!(
                "Cut marker must be a finite number, got {}",
                bad
            )));
        }

        let mut cuts: Vec<f64> = markers
            .iter()
            .copied()
            .filter(|&m| m > 0.0 && m < duration)
            .collect();
        cuts.sort_by(f64::total_cmp);
        cuts.dedup();

        let mut ranges = Vec::with_capacity(cuts.len() + 1);
        let mut start = 0.0;
        for cut in cuts {
            if cut - start < self.min_segment || duration - cut < self.min_segment {
                debug!(marker = cut, "Dropping marker closer than minimum segment");
                continue;
            }
            ranges.push(TimeRange::new(start, cut));
            start = cut;
        }
        ranges.push(TimeRange::new(start, duration));

        debug!(
            duration,
            markers = markers.len(),
            ranges = ranges.len(),
            "Timeline partitioned"
        );
        Ok(ranges)
    }
}
