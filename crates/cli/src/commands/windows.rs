//! Aggregated utilization command

use anyhow::{Context, Result};
use loadcurve_lib::pipeline::WindowAggregator;
use loadcurve_lib::{EventSource, PipelineConfig, SqliteEventLog};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{format_utilization, print_header, print_table, print_warning, OutputFormat};

/// Row for the utilization table
#[derive(Tabled, Serialize)]
struct WindowRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Offset (s)")]
    offset_secs: f64,
    #[tabled(rename = "CPU", display_with = "display_utilization")]
    utilization: f64,
    #[tabled(rename = "Samples")]
    samples: usize,
}

fn display_utilization(value: &f64) -> String {
    format_utilization(*value)
}

/// Print CPU utilization aggregated per window
pub fn show_windows(db: &Path, config: &PipelineConfig, format: OutputFormat) -> Result<()> {
    let log = SqliteEventLog::new(db);
    let cpu = log
        .read_cpu_samples()
        .with_context(|| format!("Failed to read CPU samples from {}", db.display()))?;
    let aggregation = WindowAggregator::new(&config.window)
        .and_then(|aggregator| aggregator.aggregate(&cpu))
        .context("Failed to aggregate CPU samples")?;

    let Some(start) = aggregation.series.first().map(|s| s.timestamp) else {
        match format {
            OutputFormat::Table => print_warning("Event log holds no CPU samples"),
            OutputFormat::Json => print_table::<WindowRow>(&[], format),
        }
        return Ok(());
    };

    let rows: Vec<WindowRow> = aggregation
        .series
        .iter()
        .map(|s| WindowRow {
            timestamp: s.timestamp.to_rfc3339(),
            offset_secs: (s.timestamp - start).num_milliseconds() as f64 / 1000.0,
            utilization: s.value,
            samples: s.members,
        })
        .collect();

    if let OutputFormat::Table = format {
        print_header("CPU Utilization per Window");
        if let Some(plan) = aggregation.plan {
            println!(
                "{} windows of {} samples over {}s",
                plan.window_count, plan.samples_per_window, config.window.duration_secs
            );
        }
    }
    print_table(&rows, format);
    Ok(())
}
