//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a titled section header
pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(60));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a latency value, or a dash when absent
pub fn format_latency(latency: Option<f64>) -> String {
    match latency {
        Some(value) => format!("{:.2}", value),
        None => "-".to_string(),
    }
}

/// Format utilization as a percentage
pub fn format_utilization(utilization: f64) -> String {
    format!("{:.1}%", utilization)
}

/// Color a goodness-of-fit value
pub fn color_r_squared(r_squared: Option<f64>) -> String {
    match r_squared {
        Some(r2) if r2 >= 0.8 => format!("{:.3}", r2).green().to_string(),
        Some(r2) if r2 >= 0.5 => format!("{:.3}", r2).yellow().to_string(),
        Some(r2) => format!("{:.3}", r2).red().to_string(),
        None => "n/a".dimmed().to_string(),
    }
}

/// Color a count that should ideally be zero
pub fn color_count(count: usize) -> String {
    if count == 0 {
        count.to_string().green().to_string()
    } else {
        count.to_string().yellow().to_string()
    }
}
