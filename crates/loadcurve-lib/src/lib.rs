//! Load curve analysis library
//!
//! This crate correlates periodic CPU utilization samples with per-request
//! residence times from a monitoring event log:
//! - Event log reading (SQLite)
//! - Window aggregation of CPU samples
//! - Nearest-time matching of requests to utilization levels
//! - Latency-vs-load curve, trend line and service time derivation
//! - Logging and metrics for each run

pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod source;

pub use crate::config::PipelineConfig;
pub use error::{DataSourceError, PipelineError, Result};
pub use models::*;
pub use observability::{PipelineMetrics, StructuredLogger};
pub use pipeline::Pipeline;
pub use source::{EventSource, MemorySource, SqliteEventLog};
