//! SQLite event log reader
//!
//! Reads the monitoring dashboard database:
//! - `CustomGraphData` rows hold the periodic CPU utilization samples
//! - `Request` rows hold each request's duration and request time

use super::{parse_timestamp, timestamp_from_unix_secs, EventSource};
use crate::error::{DataSourceError, Result};
use crate::models::Sample;
use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CPU_TABLE: &str = "CustomGraphData";
pub const LATENCY_TABLE: &str = "Request";

const CPU_QUERY: &str = "SELECT time, value FROM CustomGraphData ORDER BY time ASC";
const LATENCY_QUERY: &str =
    "SELECT time_requested, duration FROM Request ORDER BY time_requested ASC";

/// Read-only reader over an event log file.
///
/// Each read opens its own connection and closes it once the rows are
/// materialized.
#[derive(Debug, Clone)]
pub struct SqliteEventLog {
    path: PathBuf,
}

impl SqliteEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> std::result::Result<Connection, DataSourceError> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| DataSourceError::Open {
            path: self.path.clone(),
            source,
        })
    }

    fn read_series(
        &self,
        table: &str,
        sql: &str,
    ) -> std::result::Result<Vec<Sample>, DataSourceError> {
        let conn = self.connect()?;
        let query_err = |source| DataSourceError::Query {
            table: table.to_string(),
            source,
        };

        let exists: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        if exists == 0 {
            return Err(DataSourceError::MissingTable {
                table: table.to_string(),
            });
        }

        let mut stmt = conn.prepare(sql).map_err(query_err)?;
        let mut rows = stmt.query([]).map_err(query_err)?;
        let mut samples = Vec::new();

        while let Some(row) = rows.next().map_err(query_err)? {
            let malformed = |reason: String| DataSourceError::Malformed {
                table: table.to_string(),
                row: samples.len(),
                reason,
            };
            let timestamp = row
                .get_ref(0)
                .map_err(query_err)
                .and_then(|v| timestamp_value(v).map_err(malformed))?;
            let value = row
                .get_ref(1)
                .map_err(query_err)
                .and_then(|v| scalar_value(v).map_err(malformed))?;
            samples.push(Sample::new(timestamp, value));
        }

        debug!(table = %table, rows = samples.len(), "Read event log series");
        Ok(samples)
    }
}

impl EventSource for SqliteEventLog {
    fn read_cpu_samples(&self) -> Result<Vec<Sample>> {
        Ok(self.read_series(CPU_TABLE, CPU_QUERY)?)
    }

    fn read_latency_samples(&self) -> Result<Vec<Sample>> {
        Ok(self.read_series(LATENCY_TABLE, LATENCY_QUERY)?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn timestamp_value(value: ValueRef<'_>) -> std::result::Result<DateTime<Utc>, String> {
    match value {
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
            parse_timestamp(text)
        }
        ValueRef::Integer(secs) => DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| format!("timestamp {secs} out of range")),
        ValueRef::Real(secs) => timestamp_from_unix_secs(secs),
        other => Err(format!("unsupported timestamp type {}", other.data_type())),
    }
}

fn scalar_value(value: ValueRef<'_>) -> std::result::Result<f64, String> {
    match value {
        ValueRef::Integer(v) => Ok(v as f64),
        ValueRef::Real(v) => Ok(v),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map_err(|e| e.to_string())
            .and_then(|s| {
                s.trim()
                    .parse::<f64>()
                    .map_err(|_| format!("non-numeric value `{s}`"))
            }),
        other => Err(format!("unsupported value type {}", other.data_type())),
    }
}
