//! Configuration handling for the CLI

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use loadcurve_lib::config::{
    BucketDomain, FilterConfig, MatchStrategy, PipelineConfig, RoundingRule,
};
use std::path::{Path, PathBuf};

/// Command-line overrides applied on top of the configuration file
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Window duration in seconds
    #[arg(long)]
    pub window_secs: Option<f64>,

    /// Utilization bucket domain
    #[arg(long)]
    pub domain: Option<DomainArg>,

    /// Rounding rule for bucket assignment
    #[arg(long)]
    pub rounding: Option<RoundingArg>,

    /// Utilization points per bucket
    #[arg(long)]
    pub width: Option<u32>,

    /// Nearest-time lookup strategy
    #[arg(long)]
    pub matcher: Option<MatcherArg>,

    /// Drop points at or below this utilization
    #[arg(long)]
    pub min_util: Option<f64>,

    /// Drop points at or above this utilization
    #[arg(long)]
    pub max_util: Option<f64>,

    /// Drop points whose mean latency reaches this value
    #[arg(long)]
    pub latency_ceiling: Option<f64>,

    /// Disable all point filters
    #[arg(long, conflicts_with_all = ["min_util", "max_util", "latency_ceiling"])]
    pub no_filter: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DomainArg {
    /// Buckets 0..=100
    Zero,
    /// Buckets 1..=100
    One,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoundingArg {
    HalfEven,
    HalfUp,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MatcherArg {
    Linear,
    Binary,
}

impl From<DomainArg> for BucketDomain {
    fn from(arg: DomainArg) -> Self {
        match arg {
            DomainArg::Zero => BucketDomain::ZeroBased,
            DomainArg::One => BucketDomain::OneBased,
        }
    }
}

impl From<RoundingArg> for RoundingRule {
    fn from(arg: RoundingArg) -> Self {
        match arg {
            RoundingArg::HalfEven => RoundingRule::HalfToEven,
            RoundingArg::HalfUp => RoundingRule::HalfAwayFromZero,
        }
    }
}

impl From<MatcherArg> for MatchStrategy {
    fn from(arg: MatcherArg) -> Self {
        match arg {
            MatcherArg::Linear => MatchStrategy::LinearScan,
            MatcherArg::Binary => MatchStrategy::BinarySearch,
        }
    }
}

impl Overrides {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(secs) = self.window_secs {
            config.window.duration_secs = secs;
        }
        if let Some(domain) = self.domain {
            config.buckets.domain = domain.into();
        }
        if let Some(rounding) = self.rounding {
            config.buckets.rounding = rounding.into();
        }
        if let Some(width) = self.width {
            config.buckets.width = width;
        }
        if let Some(matcher) = self.matcher {
            config.buckets.matcher = matcher.into();
        }

        if self.no_filter {
            config.filter = FilterConfig::disabled();
            return;
        }
        if self.min_util.is_some() {
            config.filter.min_utilization = self.min_util;
        }
        if self.max_util.is_some() {
            config.filter.max_utilization = self.max_util;
        }
        if self.latency_ceiling.is_some() {
            config.filter.latency_ceiling = self.latency_ceiling;
        }
    }
}

/// Load the pipeline configuration and apply overrides.
///
/// Uses `explicit` when given, otherwise `~/.config/loadcurve/config.toml`
/// if it exists, otherwise defaults.
pub fn load(explicit: Option<&Path>, overrides: &Overrides) -> Result<PipelineConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };

    let mut config = PipelineConfig::load(path.as_deref()).with_context(|| match &path {
        Some(p) => format!("Failed to load configuration from {}", p.display()),
        None => "Failed to load configuration".to_string(),
    })?;
    overrides.apply(&mut config);
    config
        .validate()
        .context("Invalid configuration after applying command-line overrides")?;
    Ok(config)
}

/// Get the default configuration file path
fn default_config_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".config").join("loadcurve").join("config.toml"))
}
