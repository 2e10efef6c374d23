//! Load curve pipeline
//!
//! Event log -> window aggregation -> nearest-time bucketing -> curve
//! derivation. A run either produces a complete [`CurveReport`] or fails.

mod bucket;
mod curve;
mod matcher;
mod window;

pub use bucket::{bucket, mean, BucketTable, Bucketing};
pub use curve::{derive, fit_trend, median, service_time, LoadCurve};
pub use matcher::{nearest, nearest_sorted, Matcher};
pub use window::{Aggregation, WindowAggregator, WindowPlan};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{CurveReport, RunStats, Sample};
use crate::observability::{stages, PipelineMetrics, StructuredLogger};
use crate::source::EventSource;
use std::time::Instant;

/// One configured pipeline
pub struct Pipeline {
    config: PipelineConfig,
    aggregator: WindowAggregator,
    metrics: PipelineMetrics,
}

impl Pipeline {
    /// Validate the configuration and build the stages
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let aggregator = WindowAggregator::new(&config.window)?;
        Ok(Self {
            config,
            aggregator,
            metrics: PipelineMetrics::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Read both series from `source` and run every stage
    pub fn run(&self, source: &dyn EventSource) -> Result<CurveReport> {
        let logger = StructuredLogger::new(source.describe());
        logger.log_run_started(&self.config);

        let started = Instant::now();
        let read = source
            .read_cpu_samples()
            .and_then(|cpu| Ok((cpu, source.read_latency_samples()?)));
        let (cpu, latency) = match read {
            Ok(series) => series,
            Err(e) => {
                logger.log_run_failed(&e);
                return Err(e);
            }
        };
        self.metrics
            .observe_stage(stages::READ, started.elapsed().as_secs_f64());
        logger.log_series_read(cpu.len(), latency.len());

        self.process(&cpu, &latency, &logger)
            .inspect_err(|e| logger.log_run_failed(e))
    }

    /// Run every stage over already-read series
    pub fn run_on(&self, cpu: &[Sample], latency: &[Sample]) -> Result<CurveReport> {
        let logger = StructuredLogger::new("memory");
        logger.log_run_started(&self.config);
        self.process(cpu, latency, &logger)
            .inspect_err(|e| logger.log_run_failed(e))
    }

    fn process(
        &self,
        cpu: &[Sample],
        latency: &[Sample],
        logger: &StructuredLogger,
    ) -> Result<CurveReport> {
        self.metrics.add_samples_read("cpu", cpu.len());
        self.metrics.add_samples_read("latency", latency.len());

        let started = Instant::now();
        let aggregation = self.aggregator.aggregate(cpu)?;
        self.metrics
            .observe_stage(stages::AGGREGATE, started.elapsed().as_secs_f64());

        let sampling_interval_ms = aggregation
            .plan
            .and_then(|p| p.sampling_interval)
            .map(|d| d.num_milliseconds());
        let samples_per_window = aggregation.plan.map_or(0, |p| p.samples_per_window);
        logger.log_window_plan(
            sampling_interval_ms,
            samples_per_window,
            aggregation.series.len(),
        );
        if aggregation.irregular_gaps > 0 {
            logger.log_irregular_sampling(aggregation.irregular_gaps, cpu.len());
        }

        let started = Instant::now();
        let bucketing = bucket(latency, &aggregation.series, &self.config.buckets)?;
        self.metrics
            .observe_stage(stages::BUCKET, started.elapsed().as_secs_f64());
        if bucketing.skipped_non_finite > 0 {
            logger.log_samples_skipped(bucketing.skipped_non_finite, latency.len());
        }

        let started = Instant::now();
        let buckets = bucketing.table.reduce();
        let curve = derive(&buckets, &self.config.filter);
        self.metrics
            .observe_stage(stages::DERIVE, started.elapsed().as_secs_f64());

        let stats = RunStats {
            cpu_samples: cpu.len(),
            latency_samples: latency.len(),
            windows: aggregation.series.len(),
            samples_per_window,
            sampling_interval_ms,
            irregular_gaps: aggregation.irregular_gaps,
            skipped_non_finite: bucketing.skipped_non_finite,
            empty_buckets: buckets.iter().filter(|p| p.mean_latency.is_none()).count(),
            filtered_points: curve.filtered,
        };
        self.metrics.record_run(&stats);
        logger.log_run_completed(&stats, curve.points.len(), curve.trend.map(|t| t.slope));

        Ok(CurveReport {
            utilization_series: aggregation.series,
            buckets,
            points: curve.points,
            trend: curve.trend,
            service_times: curve.service_times,
            median_service_time: curve.median_service_time,
            stats,
        })
    }
}
