//! Load curve derivation
//!
//! Turns per-bucket means into the final curve: filtering, a linear trend of
//! latency against utilization, and the service time series.

use crate::config::FilterConfig;
use crate::models::{LoadPoint, ServiceTimePoint, TrendLine};

/// Filtered curve with derived series
#[derive(Debug, Clone, PartialEq)]
pub struct LoadCurve {
    pub points: Vec<LoadPoint>,
    pub trend: Option<TrendLine>,
    pub service_times: Vec<ServiceTimePoint>,
    pub median_service_time: Option<f64>,
    /// Non-empty buckets removed by the range filters
    pub filtered: usize,
}

/// Derive the curve from reduced buckets
pub fn derive(buckets: &[LoadPoint], filter: &FilterConfig) -> LoadCurve {
    let mut sorted = buckets.to_vec();
    sorted.sort_by_key(|p| p.utilization);

    let populated: Vec<LoadPoint> = sorted
        .into_iter()
        .filter(|p| p.mean_latency.is_some())
        .collect();
    let total = populated.len();

    let points: Vec<LoadPoint> = populated
        .into_iter()
        .filter(|p| {
            p.mean_latency
                .is_some_and(|latency| filter.accepts(p.utilization, latency))
        })
        .collect();

    let pairs: Vec<(f64, f64)> = points
        .iter()
        .filter_map(|p| p.mean_latency.map(|l| (f64::from(p.utilization), l)))
        .collect();

    let service_times: Vec<ServiceTimePoint> = points
        .iter()
        .filter_map(|p| {
            p.mean_latency.map(|latency| ServiceTimePoint {
                utilization: p.utilization,
                service_time: service_time(p.utilization, latency),
            })
        })
        .collect();

    let median_service_time = median(service_times.iter().map(|s| s.service_time).collect());

    LoadCurve {
        filtered: total - points.len(),
        trend: fit_trend(&pairs),
        points,
        service_times,
        median_service_time,
    }
}

/// Latency with the queueing share at `utilization` percent removed
pub fn service_time(utilization: u32, mean_latency: f64) -> f64 {
    mean_latency * (1.0 - f64::from(utilization) / 100.0)
}

/// Least-squares line through `(x, y)` points.
///
/// Absent when fewer than two distinct `x` values are present.
pub fn fit_trend(points: &[(f64, f64)]) -> Option<TrendLine> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in points {
        sxx += (x - mean_x).powi(2);
        sxy += (x - mean_x) * (y - mean_y);
    }
    if sxx.abs() < f64::EPSILON {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (x, y) in points {
        ss_res += (y - (slope * x + intercept)).powi(2);
        ss_tot += (y - mean_y).powi(2);
    }
    let r_squared = (ss_tot.abs() >= f64::EPSILON).then(|| 1.0 - ss_res / ss_tot);

    Some(TrendLine {
        slope,
        intercept,
        r_squared,
    })
}

/// Median; the mean of the middle pair for even lengths
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
