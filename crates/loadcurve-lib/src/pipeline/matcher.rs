//! Nearest-time matching against the aggregated CPU series
//!
//! Both strategies return the element with the smallest absolute time
//! difference, ties going to the element that occurs first in the series.

use crate::config::MatchStrategy;
use crate::error::{PipelineError, Result};
use crate::models::AggregatedSample;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

/// Value of the series element closest in time to `target`, by linear scan
pub fn nearest(series: &[AggregatedSample], target: DateTime<Utc>) -> Result<f64> {
    let mut best: Option<(TimeDelta, f64)> = None;
    for sample in series {
        let gap = distance(sample.timestamp, target);
        if best.map_or(true, |(d, _)| gap < d) {
            best = Some((gap, sample.value));
        }
    }
    best.map(|(_, v)| v).ok_or(PipelineError::EmptySeries)
}

/// Binary-search variant of [`nearest`] for a series sorted by timestamp
pub fn nearest_sorted(series: &[AggregatedSample], target: DateTime<Utc>) -> Result<f64> {
    if series.is_empty() {
        return Err(PipelineError::EmptySeries);
    }

    // First element at or after the target
    let right = series.partition_point(|s| s.timestamp < target);
    if right == 0 {
        return Ok(series[0].value);
    }

    // Earliest element sharing the timestamp of the last one before the target
    let left_ts = series[right - 1].timestamp;
    let left = series.partition_point(|s| s.timestamp < left_ts);
    let Some(after) = series.get(right) else {
        return Ok(series[left].value);
    };

    // On a tie the left candidate occurs first
    if distance(left_ts, target) <= distance(after.timestamp, target) {
        Ok(series[left].value)
    } else {
        Ok(after.value)
    }
}

/// Nearest-time lookup bound to one series
pub struct Matcher<'a> {
    series: &'a [AggregatedSample],
    strategy: MatchStrategy,
}

impl<'a> Matcher<'a> {
    pub fn new(series: &'a [AggregatedSample], strategy: MatchStrategy) -> Self {
        let sorted = series.windows(2).all(|w| w[0].timestamp <= w[1].timestamp);
        let strategy = match strategy {
            MatchStrategy::BinarySearch if !sorted => {
                debug!("Aggregated series is not sorted, falling back to linear scan");
                MatchStrategy::LinearScan
            }
            other => other,
        };
        Self { series, strategy }
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    pub fn value_at(&self, target: DateTime<Utc>) -> Result<f64> {
        match self.strategy {
            MatchStrategy::LinearScan => nearest(self.series, target),
            MatchStrategy::BinarySearch => nearest_sorted(self.series, target),
        }
    }
}

/// Exact absolute difference, nanosecond resolution
fn distance(a: DateTime<Utc>, b: DateTime<Utc>) -> TimeDelta {
    (a - b).abs()
}
