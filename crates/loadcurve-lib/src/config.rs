//! Pipeline configuration
//!
//! Every stage receives its parameters from a [`PipelineConfig`] value; there
//! is no global state, so independent runs can use different settings.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Highest utilization level a bucket can represent
pub const MAX_UTILIZATION: u32 = 100;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "LOADCURVE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub window: WindowConfig,
    pub buckets: BucketConfig,
    pub filter: FilterConfig,
}

/// CPU sample windowing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window duration in seconds
    pub duration_secs: f64,
    /// What to do when CPU samples arrive out of timestamp order
    pub unordered: OrderingPolicy,
    /// Relative deviation from the inferred sampling interval beyond which a
    /// gap is reported as irregular
    pub gap_tolerance: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            duration_secs: 10.0,
            unordered: OrderingPolicy::Sort,
            gap_tolerance: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Stable sort by timestamp before windowing
    #[default]
    Sort,
    /// Fail the run
    Reject,
}

/// Utilization bucketing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    pub domain: BucketDomain,
    /// Utilization points covered by one bucket
    pub width: u32,
    pub rounding: RoundingRule,
    pub matcher: MatchStrategy,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            domain: BucketDomain::ZeroBased,
            width: 1,
            rounding: RoundingRule::HalfToEven,
            matcher: MatchStrategy::LinearScan,
        }
    }
}

impl BucketConfig {
    /// All bucket keys, ascending
    pub fn keys(&self) -> Vec<u32> {
        let (first, last) = self.key_bounds();
        (first..=last).step_by(self.width as usize).collect()
    }

    /// Bucket key for a matched utilization value.
    ///
    /// The value is rounded to the nearest multiple of `width` using the
    /// configured rule, then clamped into the domain. `value` must be finite.
    pub fn key_for(&self, value: f64) -> u32 {
        let width = f64::from(self.width);
        let rounded = self.rounding.apply(value / width) * width;
        let (first, last) = self.key_bounds();
        rounded.clamp(f64::from(first), f64::from(last)) as u32
    }

    fn key_bounds(&self) -> (u32, u32) {
        let lower = self.domain.lower();
        let first = lower.div_ceil(self.width) * self.width;
        let last = MAX_UTILIZATION / self.width * self.width;
        (first, last)
    }
}

/// Which integer levels the bucket mapping spans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketDomain {
    /// 0..=100
    #[default]
    ZeroBased,
    /// 1..=100
    OneBased,
}

impl BucketDomain {
    pub fn lower(self) -> u32 {
        match self {
            Self::ZeroBased => 0,
            Self::OneBased => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingRule {
    /// Banker's rounding: 2.5 -> 2, 3.5 -> 4
    #[default]
    HalfToEven,
    /// 2.5 -> 3, 3.5 -> 4
    #[serde(alias = "half_up")]
    HalfAwayFromZero,
}

impl RoundingRule {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::HalfToEven => value.round_ties_even(),
            Self::HalfAwayFromZero => value.round(),
        }
    }
}

/// Nearest-time lookup implementation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// O(n) per lookup
    #[default]
    LinearScan,
    /// O(log n) per lookup, same result as the scan
    BinarySearch,
}

/// Filters applied to the reduced load points.
///
/// Every bound is exclusive; `None` disables it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub min_utilization: Option<f64>,
    pub max_utilization: Option<f64>,
    pub latency_ceiling: Option<f64>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_utilization: Some(5.0),
            max_utilization: Some(95.0),
            latency_ceiling: Some(1000.0),
        }
    }
}

impl FilterConfig {
    pub fn disabled() -> Self {
        Self {
            min_utilization: None,
            max_utilization: None,
            latency_ceiling: None,
        }
    }

    pub fn accepts(&self, utilization: u32, mean_latency: f64) -> bool {
        let utilization = f64::from(utilization);
        self.min_utilization.map_or(true, |min| utilization > min)
            && self.max_utilization.map_or(true, |max| utilization < max)
            && self.latency_ceiling.map_or(true, |c| mean_latency < c)
    }
}

impl PipelineConfig {
    /// Load configuration from an optional TOML file and `LOADCURVE__*`
    /// environment variables, then validate it
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| PipelineError::config(e.to_string()))?;

        let config: PipelineConfig = settings
            .try_deserialize()
            .map_err(|e| PipelineError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations no stage can work with
    pub fn validate(&self) -> Result<()> {
        let window = self.window.duration_secs;
        if !window.is_finite() || window <= 0.0 {
            return Err(PipelineError::config(format!(
                "window duration must be a positive number of seconds, got {window}"
            )));
        }
        if !self.window.gap_tolerance.is_finite() || self.window.gap_tolerance < 0.0 {
            return Err(PipelineError::config(format!(
                "gap tolerance must be non-negative, got {}",
                self.window.gap_tolerance
            )));
        }

        let width = self.buckets.width;
        if width == 0 || width > MAX_UTILIZATION {
            return Err(PipelineError::config(format!(
                "bucket width must be between 1 and {MAX_UTILIZATION}, got {width}"
            )));
        }

        let filter = &self.filter;
        for (name, bound) in [
            ("min_utilization", filter.min_utilization),
            ("max_utilization", filter.max_utilization),
        ] {
            if matches!(bound, Some(v) if !v.is_finite()) {
                return Err(PipelineError::config(format!("{name} must be finite")));
            }
        }
        if let (Some(min), Some(max)) = (filter.min_utilization, filter.max_utilization) {
            if min >= max {
                return Err(PipelineError::config(format!(
                    "utilization range is empty: min {min} >= max {max}"
                )));
            }
        }
        if let Some(ceiling) = filter.latency_ceiling {
            if !ceiling.is_finite() || ceiling <= 0.0 {
                return Err(PipelineError::config(format!(
                    "latency ceiling must be positive, got {ceiling}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn toml_file(content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window.duration_secs, 10.0);
        assert_eq!(config.buckets.domain, BucketDomain::ZeroBased);
        assert_eq!(config.buckets.rounding, RoundingRule::HalfToEven);
        assert_eq!(config.filter.latency_ceiling, Some(1000.0));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = PipelineConfig::default();
        config.window.duration_secs = 0.0;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Configuration(_))
        ));
        config.window.duration_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_utilization_range_rejected() {
        let mut config = PipelineConfig::default();
        config.filter.min_utilization = Some(90.0);
        config.filter.max_utilization = Some(10.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bucket_width_bounds() {
        let mut config = PipelineConfig::default();
        config.buckets.width = 0;
        assert!(config.validate().is_err());
        config.buckets.width = 101;
        assert!(config.validate().is_err());
        config.buckets.width = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_domain_keys() {
        let mut buckets = BucketConfig::default();
        let keys = buckets.keys();
        assert_eq!(keys.len(), 101);
        assert_eq!(keys.first(), Some(&0));
        assert_eq!(keys.last(), Some(&100));

        buckets.domain = BucketDomain::OneBased;
        let keys = buckets.keys();
        assert_eq!(keys.len(), 100);
        assert_eq!(keys.first(), Some(&1));

        buckets.width = 5;
        let keys = buckets.keys();
        assert_eq!(keys.first(), Some(&5));
        assert_eq!(keys.last(), Some(&100));
        assert_eq!(keys.len(), 20);
    }

    #[test]
    fn test_rounding_rules_at_half() {
        let mut buckets = BucketConfig::default();
        assert_eq!(buckets.key_for(42.5), 42);
        assert_eq!(buckets.key_for(43.5), 44);
        assert_eq!(buckets.key_for(42.4), 42);

        buckets.rounding = RoundingRule::HalfAwayFromZero;
        assert_eq!(buckets.key_for(42.5), 43);
        assert_eq!(buckets.key_for(43.5), 44);
    }

    #[test]
    fn test_key_clamped_into_domain() {
        let mut buckets = BucketConfig::default();
        assert_eq!(buckets.key_for(-3.0), 0);
        assert_eq!(buckets.key_for(130.0), 100);

        buckets.domain = BucketDomain::OneBased;
        assert_eq!(buckets.key_for(0.2), 1);
    }

    #[test]
    fn test_key_with_width() {
        let buckets = BucketConfig {
            width: 5,
            ..BucketConfig::default()
        };
        assert_eq!(buckets.key_for(51.0), 50);
        assert_eq!(buckets.key_for(53.0), 55);
        assert_eq!(buckets.key_for(99.0), 100);
    }

    #[test]
    fn test_filter_bounds_are_exclusive() {
        let filter = FilterConfig::default();
        assert!(!filter.accepts(5, 10.0));
        assert!(filter.accepts(6, 10.0));
        assert!(!filter.accepts(95, 10.0));
        assert!(!filter.accepts(50, 1000.0));
        assert!(filter.accepts(50, 999.9));
        assert!(FilterConfig::disabled().accepts(0, 1e9));
    }

    #[test]
    fn test_load_from_toml() {
        let toml_content = r#"
[window]
duration_secs = 20.0
unordered = "reject"

[buckets]
domain = "one_based"
rounding = "half_up"
matcher = "binary_search"

[filter]
min_utilization = 10.0
"#;
        let file = toml_file(toml_content);

        let config = PipelineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.window.duration_secs, 20.0);
        assert_eq!(config.window.unordered, OrderingPolicy::Reject);
        assert_eq!(config.buckets.domain, BucketDomain::OneBased);
        assert_eq!(config.buckets.rounding, RoundingRule::HalfAwayFromZero);
        assert_eq!(config.buckets.matcher, MatchStrategy::BinarySearch);
        assert_eq!(config.filter.min_utilization, Some(10.0));
        // Unspecified values keep their defaults
        assert_eq!(config.filter.max_utilization, Some(95.0));
        assert_eq!(config.buckets.width, 1);
    }

    #[test]
    fn test_environment_overrides_file() {
        // Only gap_tolerance so concurrent load tests are unaffected
        let var = "LOADCURVE__WINDOW__GAP_TOLERANCE";
        std::env::set_var(var, "0.25");
        let file = toml_file("[window]\nduration_secs = 30.0\ngap_tolerance = 0.1\n");

        let loaded = PipelineConfig::load(Some(file.path()));
        let from_env_only = PipelineConfig::load(None);
        std::env::remove_var(var);

        let config = loaded.unwrap();
        assert_eq!(config.window.gap_tolerance, 0.25);
        assert_eq!(config.window.duration_secs, 30.0);
        assert_eq!(from_env_only.unwrap().window.gap_tolerance, 0.25);
    }

    #[test]
    fn test_load_rejects_invalid_file_values() {
        let file = toml_file("[window]\nduration_secs = -1.0\n");
        assert!(matches!(
            PipelineConfig::load(Some(file.path())),
            Err(PipelineError::Configuration(_))
        ));
    }
}
