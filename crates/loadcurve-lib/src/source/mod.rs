//! Event log access
//!
//! The pipeline reads two series, CPU utilization samples and request
//! residence times, through the [`EventSource`] trait. The log itself is
//! owned by the monitoring dashboard; this module only reads it.

mod sqlite;

pub use sqlite::{SqliteEventLog, CPU_TABLE, LATENCY_TABLE};

use crate::error::Result;
use crate::models::Sample;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Trait for event log readers
///
/// Both series must be returned in ascending timestamp order, on the same
/// clock.
pub trait EventSource {
    /// Periodic CPU utilization samples, values in percent
    fn read_cpu_samples(&self) -> Result<Vec<Sample>>;

    /// Per-request residence times
    fn read_latency_samples(&self) -> Result<Vec<Sample>>;

    /// Short label used in log events
    fn describe(&self) -> String;
}

/// Source backed by already-materialized sequences
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    cpu: Vec<Sample>,
    latency: Vec<Sample>,
}

impl MemorySource {
    pub fn new(cpu: Vec<Sample>, latency: Vec<Sample>) -> Self {
        Self { cpu, latency }
    }
}

impl EventSource for MemorySource {
    fn read_cpu_samples(&self) -> Result<Vec<Sample>> {
        Ok(self.cpu.clone())
    }

    fn read_latency_samples(&self) -> Result<Vec<Sample>> {
        Ok(self.latency.clone())
    }

    fn describe(&self) -> String {
        format!("memory({} cpu, {} latency)", self.cpu.len(), self.latency.len())
    }
}

/// Parse a textual event timestamp.
///
/// Accepts the dashboard's `YYYY-MM-DD HH:MM:SS[.ffffff]` form, read as UTC,
/// and RFC 3339.
pub fn parse_timestamp(text: &str) -> std::result::Result<DateTime<Utc>, String> {
    let text = text.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    Err(format!("unrecognized timestamp `{text}`"))
}

/// Convert fractional unix seconds to a timestamp with microsecond precision
pub fn timestamp_from_unix_secs(secs: f64) -> std::result::Result<DateTime<Utc>, String> {
    if !secs.is_finite() {
        return Err(format!("timestamp {secs} is not finite"));
    }
    DateTime::from_timestamp_micros((secs * 1e6).round() as i64)
        .ok_or_else(|| format!("timestamp {secs} out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parse_dashboard_timestamp() {
        let ts = parse_timestamp("2021-01-08 10:15:30.250000").unwrap();
        assert_eq!(ts.hour(), 10);
        assert_eq!(ts.second(), 30);
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_timestamp_without_fraction() {
        let ts = parse_timestamp("2021-01-08 10:15:30").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2021, 1, 8, 10, 15, 30).unwrap());
    }

    #[test]
    fn test_parse_rfc3339_timestamp() {
        let ts = parse_timestamp("2021-01-08T11:15:30+01:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2021, 1, 8, 10, 15, 30).unwrap());
    }

    #[test]
    fn test_parse_garbage_timestamp() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_unix_seconds_conversion() {
        let ts = timestamp_from_unix_secs(1.5).unwrap();
        assert_eq!(ts.timestamp(), 1);
        assert_eq!(ts.timestamp_subsec_millis(), 500);
        assert!(timestamp_from_unix_secs(f64::NAN).is_err());
    }

    #[test]
    fn test_memory_source_returns_inputs() {
        let t = Utc.timestamp_opt(0, 0).unwrap();
        let source = MemorySource::new(vec![Sample::new(t, 40.0)], vec![]);
        assert_eq!(source.read_cpu_samples().unwrap().len(), 1);
        assert!(source.read_latency_samples().unwrap().is_empty());
        assert_eq!(source.describe(), "memory(1 cpu, 0 latency)");
    }
}
