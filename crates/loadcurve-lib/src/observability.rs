//! Observability infrastructure for pipeline runs
//!
//! Provides:
//! - Prometheus metrics (samples read, windows, skipped samples, stage latency)
//! - Structured logging with tracing

use crate::config::PipelineConfig;
use crate::models::RunStats;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tracing::{debug, error, info, warn};

/// Histogram buckets for stage durations (in seconds)
const STAGE_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0,
];

/// Pipeline stage labels
pub mod stages {
    pub const READ: &str = "read";
    pub const AGGREGATE: &str = "aggregate";
    pub const BUCKET: &str = "bucket";
    pub const DERIVE: &str = "derive";
}

/// Metrics for one pipeline instance
///
/// Each instance owns its registry, so parallel runs never share counters.
#[derive(Clone)]
pub struct PipelineMetrics {
    registry: Registry,
    samples_read: IntCounterVec,
    windows_built: IntGauge,
    samples_skipped: IntCounter,
    empty_buckets: IntGauge,
    points_filtered: IntGauge,
    stage_duration_seconds: HistogramVec,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let samples_read = IntCounterVec::new(
            Opts::new(
                "loadcurve_samples_read_total",
                "Samples read from the event log",
            ),
            &["series"],
        )
        .expect("Failed to create samples_read");
        let windows_built = IntGauge::new(
            "loadcurve_windows_built",
            "Aggregated CPU windows in the last run",
        )
        .expect("Failed to create windows_built");
        let samples_skipped = IntCounter::new(
            "loadcurve_samples_skipped_total",
            "Latency samples skipped because the matched utilization was not finite",
        )
        .expect("Failed to create samples_skipped");
        let empty_buckets = IntGauge::new(
            "loadcurve_empty_buckets",
            "Utilization buckets without any latency sample",
        )
        .expect("Failed to create empty_buckets");
        let points_filtered = IntGauge::new(
            "loadcurve_points_filtered",
            "Load points removed by the range filters",
        )
        .expect("Failed to create points_filtered");
        let stage_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "loadcurve_stage_duration_seconds",
                "Time spent in each pipeline stage",
            )
            .buckets(STAGE_BUCKETS.to_vec()),
            &["stage"],
        )
        .expect("Failed to create stage_duration_seconds");

        registry
            .register(Box::new(samples_read.clone()))
            .expect("Failed to register samples_read");
        registry
            .register(Box::new(windows_built.clone()))
            .expect("Failed to register windows_built");
        registry
            .register(Box::new(samples_skipped.clone()))
            .expect("Failed to register samples_skipped");
        registry
            .register(Box::new(empty_buckets.clone()))
            .expect("Failed to register empty_buckets");
        registry
            .register(Box::new(points_filtered.clone()))
            .expect("Failed to register points_filtered");
        registry
            .register(Box::new(stage_duration_seconds.clone()))
            .expect("Failed to register stage_duration_seconds");

        Self {
            registry,
            samples_read,
            windows_built,
            samples_skipped,
            empty_buckets,
            points_filtered,
            stage_duration_seconds,
        }
    }

    pub fn add_samples_read(&self, series: &str, count: usize) {
        self.samples_read
            .with_label_values(&[series])
            .inc_by(count as u64);
    }

    pub fn observe_stage(&self, stage: &str, duration_secs: f64) {
        self.stage_duration_seconds
            .with_label_values(&[stage])
            .observe(duration_secs);
    }

    /// Record the outcome counters of a completed run
    pub fn record_run(&self, stats: &RunStats) {
        self.windows_built.set(stats.windows as i64);
        self.samples_skipped.inc_by(stats.skipped_non_finite as u64);
        self.empty_buckets.set(stats.empty_buckets as i64);
        self.points_filtered.set(stats.filtered_points as i64);
    }

    pub fn samples_read(&self, series: &str) -> u64 {
        self.samples_read.with_label_values(&[series]).get()
    }

    pub fn samples_skipped(&self) -> u64 {
        self.samples_skipped.get()
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Structured logger for pipeline events
#[derive(Clone)]
pub struct StructuredLogger {
    source: String,
}

impl StructuredLogger {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn log_run_started(&self, config: &PipelineConfig) {
        info!(
            event = "run_started",
            source = %self.source,
            window_secs = config.window.duration_secs,
            domain = ?config.buckets.domain,
            bucket_width = config.buckets.width,
            rounding = ?config.buckets.rounding,
            matcher = ?config.buckets.matcher,
            "Starting load curve run"
        );
    }

    pub fn log_series_read(&self, cpu_samples: usize, latency_samples: usize) {
        info!(
            event = "series_read",
            source = %self.source,
            cpu_samples = cpu_samples,
            latency_samples = latency_samples,
            "Read event log"
        );
    }

    pub fn log_window_plan(
        &self,
        sampling_interval_ms: Option<i64>,
        samples_per_window: usize,
        windows: usize,
    ) {
        debug!(
            event = "window_plan",
            source = %self.source,
            sampling_interval_ms = ?sampling_interval_ms,
            samples_per_window = samples_per_window,
            windows = windows,
            "Partitioned CPU samples"
        );
    }

    /// Sampling gaps that deviate from the inferred interval
    pub fn log_irregular_sampling(&self, irregular_gaps: usize, cpu_samples: usize) {
        warn!(
            event = "irregular_sampling",
            source = %self.source,
            irregular_gaps = irregular_gaps,
            cpu_samples = cpu_samples,
            "CPU sampling is not uniform; window boundaries are approximate"
        );
    }

    pub fn log_samples_skipped(&self, skipped: usize, latency_samples: usize) {
        warn!(
            event = "samples_skipped",
            source = %self.source,
            skipped = skipped,
            latency_samples = latency_samples,
            "Latency samples matched a non-finite utilization and were excluded"
        );
    }

    pub fn log_run_completed(&self, stats: &RunStats, points: usize, slope: Option<f64>) {
        info!(
            event = "run_completed",
            source = %self.source,
            windows = stats.windows,
            points = points,
            empty_buckets = stats.empty_buckets,
            filtered_points = stats.filtered_points,
            skipped = stats.skipped_non_finite,
            trend_slope = ?slope,
            "Load curve derived"
        );
    }

    pub fn log_run_failed(&self, err: &dyn std::error::Error) {
        error!(
            event = "run_failed",
            source = %self.source,
            error = %err,
            "Load curve run failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_are_per_instance() {
        let first = PipelineMetrics::new();
        let second = PipelineMetrics::new();
        first.add_samples_read("cpu", 10);
        assert_eq!(first.samples_read("cpu"), 10);
        assert_eq!(second.samples_read("cpu"), 0);
    }

    #[test]
    fn test_record_run_and_encode() {
        let metrics = PipelineMetrics::new();
        metrics.observe_stage(stages::AGGREGATE, 0.002);
        metrics.record_run(&RunStats {
            windows: 4,
            skipped_non_finite: 2,
            empty_buckets: 90,
            ..RunStats::default()
        });
        assert_eq!(metrics.samples_skipped(), 2);

        let text = metrics.encode();
        assert!(text.contains("loadcurve_windows_built 4"));
        assert!(text.contains("loadcurve_stage_duration_seconds"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("events.db");
        assert_eq!(logger.source, "events.db");
    }
}
