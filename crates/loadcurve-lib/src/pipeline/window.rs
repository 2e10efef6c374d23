//! Window aggregation of CPU samples
//!
//! Splits the CPU series into consecutive groups by count and reduces each
//! group to one point. The group size is derived from the window duration and
//! the gap between the first two samples, so boundaries drift away from exact
//! multiples of the window duration over long runs.

use crate::config::{OrderingPolicy, WindowConfig};
use crate::error::{DataSourceError, PipelineError, Result};
use crate::models::{AggregatedSample, Sample, Window};
use chrono::TimeDelta;
use std::borrow::Cow;
use tracing::warn;

/// How the series will be partitioned
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowPlan {
    /// Gap between the first two samples; absent for a single sample
    pub sampling_interval: Option<TimeDelta>,
    pub samples_per_window: usize,
    pub window_count: usize,
}

/// Output of [`WindowAggregator::aggregate`]
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub series: Vec<AggregatedSample>,
    /// Absent for empty input
    pub plan: Option<WindowPlan>,
    pub irregular_gaps: usize,
}

pub struct WindowAggregator {
    duration: TimeDelta,
    unordered: OrderingPolicy,
    gap_tolerance: f64,
}

impl WindowAggregator {
    pub fn new(config: &WindowConfig) -> Result<Self> {
        let micros = config.duration_secs * 1e6;
        if !micros.is_finite() || micros < 1.0 {
            return Err(PipelineError::config(format!(
                "window duration {}s is too short",
                config.duration_secs
            )));
        }
        Ok(Self {
            duration: TimeDelta::microseconds(micros.round() as i64),
            unordered: config.unordered,
            gap_tolerance: config.gap_tolerance,
        })
    }

    pub fn duration(&self) -> TimeDelta {
        self.duration
    }

    /// Aggregate a CPU series into one point per window
    pub fn aggregate(&self, samples: &[Sample]) -> Result<Aggregation> {
        let samples = self.ensure_ordered(samples)?;
        let Some(plan) = self.plan(&samples)? else {
            return Ok(Aggregation {
                series: Vec::new(),
                plan: None,
                irregular_gaps: 0,
            });
        };

        let irregular_gaps = plan
            .sampling_interval
            .map(|interval| self.count_irregular_gaps(&samples, interval))
            .unwrap_or(0);

        let series = self
            .windows(&samples, &plan)
            .iter()
            .map(|window| self.reduce(window))
            .collect();

        Ok(Aggregation {
            series,
            plan: Some(plan),
            irregular_gaps,
        })
    }

    /// Derive the partition for an ordered series; `None` when it is empty
    pub fn plan(&self, samples: &[Sample]) -> Result<Option<WindowPlan>> {
        let (first, second) = match samples {
            [] => return Ok(None),
            [_] => {
                return Ok(Some(WindowPlan {
                    sampling_interval: None,
                    samples_per_window: 1,
                    window_count: 1,
                }))
            }
            [first, second, ..] => (first, second),
        };

        let interval = second.timestamp - first.timestamp;
        let interval_us = interval.num_microseconds().unwrap_or(i64::MAX);
        if interval_us <= 0 {
            return Err(PipelineError::config(
                "cannot infer sampling interval: the first two CPU samples share a timestamp",
            ));
        }

        let window_us = self.duration.num_microseconds().unwrap_or(i64::MAX);
        let per_window = (window_us as f64 / interval_us as f64).round_ties_even();
        if per_window < 1.0 {
            return Err(PipelineError::config(format!(
                "window duration {}ms is finer than the sampling interval {}ms",
                self.duration.num_milliseconds(),
                interval.num_milliseconds()
            )));
        }

        let samples_per_window = per_window as usize;
        Ok(Some(WindowPlan {
            sampling_interval: Some(interval),
            samples_per_window,
            window_count: samples.len().div_ceil(samples_per_window),
        }))
    }

    /// Partition into `plan.window_count` contiguous groups whose sizes
    /// differ by at most one, larger groups first
    pub fn windows(&self, samples: &[Sample], plan: &WindowPlan) -> Vec<Window> {
        let count = plan.window_count.min(samples.len());
        if count == 0 {
            return Vec::new();
        }
        let base = samples.len() / count;
        let extra = samples.len() % count;

        let mut windows = Vec::with_capacity(count);
        let mut offset = 0;
        for i in 0..count {
            let size = base + usize::from(i < extra);
            let members = samples[offset..offset + size].to_vec();
            offset += size;
            windows.push(Window {
                start: members[0].timestamp,
                members,
            });
        }
        windows
    }

    /// Timestamp is the window start plus half the window duration, not the
    /// members' actual midpoint. The mean is shifted by the first member so a
    /// window of identical values reduces to exactly that value.
    pub fn reduce(&self, window: &Window) -> AggregatedSample {
        let members = window.members.len();
        let value = match window.members.first() {
            Some(pivot) => {
                let shift: f64 = window.members.iter().map(|s| s.value - pivot.value).sum();
                pivot.value + shift / members as f64
            }
            None => f64::NAN,
        };
        AggregatedSample {
            timestamp: window.start + self.duration / 2,
            value,
            members,
        }
    }

    fn ensure_ordered<'a>(&self, samples: &'a [Sample]) -> Result<Cow<'a, [Sample]>> {
        let Some(index) = samples
            .windows(2)
            .position(|pair| pair[1].timestamp < pair[0].timestamp)
        else {
            return Ok(Cow::Borrowed(samples));
        };

        match self.unordered {
            OrderingPolicy::Reject => Err(DataSourceError::Unordered {
                series: "cpu".to_string(),
                index: index + 1,
            }
            .into()),
            OrderingPolicy::Sort => {
                warn!(
                    event = "unordered_samples",
                    series = "cpu",
                    first_index = index + 1,
                    "CPU samples out of timestamp order, sorting"
                );
                let mut sorted = samples.to_vec();
                sorted.sort_by_key(|s| s.timestamp);
                Ok(Cow::Owned(sorted))
            }
        }
    }

    fn count_irregular_gaps(&self, samples: &[Sample], interval: TimeDelta) -> usize {
        let expected = interval.num_microseconds().unwrap_or(i64::MAX) as f64;
        let tolerance = expected * self.gap_tolerance;
        samples
            .windows(2)
            .filter(|pair| {
                let gap = (pair[1].timestamp - pair[0].timestamp)
                    .num_microseconds()
                    .unwrap_or(i64::MAX) as f64;
                (gap - expected).abs() > tolerance
            })
            .count()
    }
}
