//! Error taxonomy for the pipeline
//!
//! Every variant is fatal for the run that produced it. Per-sample anomalies
//! are not errors; they are counted in [`RunStats`](crate::models::RunStats).

use std::path::PathBuf;
use thiserror::Error;

/// Failures reading from the event log
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("failed to open event log {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("event log has no `{table}` table")]
    MissingTable { table: String },

    #[error("query against `{table}` failed")]
    Query {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("malformed row {row} in `{table}`: {reason}")]
    Malformed {
        table: String,
        row: usize,
        reason: String,
    },

    #[error("{series} samples are out of timestamp order at index {index}")]
    Unordered { series: String, index: usize },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("nearest-time match attempted against an empty series")]
    EmptySeries,
}

impl PipelineError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
