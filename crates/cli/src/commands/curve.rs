//! Load curve command

use anyhow::{Context, Result};
use colored::Colorize;
use loadcurve_lib::{CurveReport, Pipeline, PipelineConfig, SqliteEventLog};
use std::path::Path;
use tabled::Tabled;

use crate::output::{
    color_count, color_r_squared, format_latency, print_header, print_info, print_success,
    print_warning, OutputFormat,
};

/// Row for the load curve table
#[derive(Tabled)]
struct CurveRow {
    #[tabled(rename = "CPU %")]
    utilization: u32,
    #[tabled(rename = "Requests")]
    samples: usize,
    #[tabled(rename = "Mean latency")]
    mean_latency: String,
    #[tabled(rename = "Service time")]
    service_time: String,
}

/// Derive and print the latency-vs-load curve for an event log
pub fn show_curve(
    db: &Path,
    config: PipelineConfig,
    output: Option<&Path>,
    show_metrics: bool,
    format: OutputFormat,
) -> Result<()> {
    let pipeline = Pipeline::new(config).context("Invalid pipeline configuration")?;
    let report = pipeline
        .run(&SqliteEventLog::new(db))
        .with_context(|| format!("Failed to derive load curve from {}", db.display()))?;

    let json = report
        .to_json_pretty()
        .context("Failed to serialize report")?;
    if let Some(path) = output {
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    match format {
        OutputFormat::Json => println!("{}", json),
        OutputFormat::Table => {
            print_report(&report);
            if let Some(path) = output {
                print_success(&format!("Report written to {}", path.display()));
            }
        }
    }

    if show_metrics {
        eprintln!("{}", pipeline.metrics().encode());
    }
    Ok(())
}

fn print_report(report: &CurveReport) {
    let stats = &report.stats;
    print_header("Load Curve");
    println!("CPU samples:       {}", stats.cpu_samples);
    println!("Latency samples:   {}", stats.latency_samples);
    println!(
        "Windows:           {} ({} samples each)",
        stats.windows, stats.samples_per_window
    );
    if let Some(ms) = stats.sampling_interval_ms {
        println!("Sampling interval: {} ms", ms);
    }
    println!("Irregular gaps:    {}", color_count(stats.irregular_gaps));
    println!(
        "Skipped samples:   {}",
        color_count(stats.skipped_non_finite)
    );
    println!("Empty buckets:     {}", stats.empty_buckets);
    println!("Filtered points:   {}", stats.filtered_points);
    println!();

    if report.points.is_empty() {
        print_warning("No load points survived filtering");
        return;
    }

    let rows: Vec<CurveRow> = report
        .points
        .iter()
        .zip(&report.service_times)
        .map(|(point, service)| CurveRow {
            utilization: point.utilization,
            samples: point.samples,
            mean_latency: format_latency(point.mean_latency),
            service_time: format_latency(Some(service.service_time)),
        })
        .collect();
    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
    println!();

    match &report.trend {
        Some(trend) => {
            println!("{}", "Trend line".bold());
            println!("{}", "-".repeat(60));
            println!(
                "latency = {} x cpu + {}",
                format!("{:.4}", trend.slope).cyan(),
                format!("{:.4}", trend.intercept).cyan()
            );
            println!("R²: {}", color_r_squared(trend.r_squared));
        }
        None => print_info("Trend line needs at least two utilization levels"),
    }
    if let Some(median) = report.median_service_time {
        println!(
            "Median service time: {}",
            format_latency(Some(median)).cyan()
        );
    }
}
