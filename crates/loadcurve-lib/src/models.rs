//! Core data models for the load curve pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped observation read from the event log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A contiguous group of consecutive CPU samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub members: Vec<Sample>,
}

/// Representative point reduced from one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Number of raw samples the window held
    pub members: usize,
}

/// Mean latency observed at one utilization level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadPoint {
    pub utilization: u32,
    /// Absent when no latency sample landed in the bucket
    pub mean_latency: Option<f64>,
    pub samples: usize,
}

/// First-degree least-squares fit of latency against utilization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; absent when latency is constant
    pub r_squared: Option<f64>,
}

impl TrendLine {
    pub fn predict(&self, utilization: f64) -> f64 {
        self.slope * utilization + self.intercept
    }
}

/// Latency with the queueing share removed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceTimePoint {
    pub utilization: u32,
    pub service_time: f64,
}

/// Counters describing one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub cpu_samples: usize,
    pub latency_samples: usize,
    pub windows: usize,
    pub samples_per_window: usize,
    /// Gap between the first two CPU samples, in milliseconds
    pub sampling_interval_ms: Option<i64>,
    pub irregular_gaps: usize,
    pub skipped_non_finite: usize,
    pub empty_buckets: usize,
    pub filtered_points: usize,
}

/// Everything a run produces for reporting and plotting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveReport {
    /// Utilization over time
    pub utilization_series: Vec<AggregatedSample>,
    /// One entry per bucket key, empty buckets included
    pub buckets: Vec<LoadPoint>,
    /// Buckets that survived the empty-bucket and range filters
    pub points: Vec<LoadPoint>,
    pub trend: Option<TrendLine>,
    pub service_times: Vec<ServiceTimePoint>,
    pub median_service_time: Option<f64>,
    pub stats: RunStats,
}

impl CurveReport {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
