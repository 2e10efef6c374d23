//! Load bucketing
//!
//! Assigns each latency sample to the utilization level in effect when it was
//! recorded, then reduces every bucket to a mean latency.

use super::matcher::Matcher;
use crate::config::BucketConfig;
use crate::error::{PipelineError, Result};
use crate::models::{AggregatedSample, LoadPoint, Sample};
use std::collections::BTreeMap;
use tracing::debug;

/// Latency values grouped by utilization level.
///
/// Holds every key of the configured domain, empty or not.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketTable {
    buckets: BTreeMap<u32, Vec<f64>>,
}

impl BucketTable {
    pub fn empty(config: &BucketConfig) -> Self {
        Self {
            buckets: config.keys().into_iter().map(|k| (k, Vec::new())).collect(),
        }
    }

    pub fn get(&self, utilization: u32) -> Option<&[f64]> {
        self.buckets.get(&utilization).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.buckets.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn assigned(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    fn push(&mut self, utilization: u32, latency: f64) {
        self.buckets.entry(utilization).or_default().push(latency);
    }

    /// One point per bucket in ascending utilization order
    pub fn reduce(&self) -> Vec<LoadPoint> {
        self.buckets
            .iter()
            .map(|(&utilization, values)| LoadPoint {
                utilization,
                mean_latency: mean(values),
                samples: values.len(),
            })
            .collect()
    }
}

/// Result of [`bucket`]
#[derive(Debug, Clone, PartialEq)]
pub struct Bucketing {
    pub table: BucketTable,
    /// Samples whose matched utilization was not finite
    pub skipped_non_finite: usize,
}

/// Assign every latency sample to a bucket.
///
/// Fails with [`PipelineError::EmptySeries`] when `cpu_series` is empty.
pub fn bucket(
    latency: &[Sample],
    cpu_series: &[AggregatedSample],
    config: &BucketConfig,
) -> Result<Bucketing> {
    if cpu_series.is_empty() {
        return Err(PipelineError::EmptySeries);
    }

    let matcher = Matcher::new(cpu_series, config.matcher);
    let mut table = BucketTable::empty(config);
    let mut skipped_non_finite = 0;

    for sample in latency {
        let utilization = matcher.value_at(sample.timestamp)?;
        if !utilization.is_finite() {
            skipped_non_finite += 1;
            debug!(
                event = "sample_skipped",
                timestamp = %sample.timestamp,
                matched = utilization,
                "Skipping latency sample with non-finite utilization"
            );
            continue;
        }
        table.push(config.key_for(utilization), sample.value);
    }

    Ok(Bucketing {
        table,
        skipped_non_finite,
    })
}

/// Arithmetic mean, absent for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
