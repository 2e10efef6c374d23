//! Load curve CLI
//!
//! Derives latency-vs-load curves from a monitoring dashboard event log:
//! CPU utilization per window, mean request latency per utilization level,
//! the fitted trend line and the derived service time.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{curve, inspect, windows};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Load curve CLI
#[derive(Parser)]
#[command(name = "loadcurve")]
#[command(author, version, about = "Latency vs CPU load analysis for monitoring event logs", long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (can also be set via LOADCURVE_CONFIG env var)
    #[arg(long, short, env = "LOADCURVE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Derive the latency-vs-load curve
    Curve {
        /// Event log database
        #[arg(long)]
        db: PathBuf,

        #[command(flatten)]
        overrides: config::Overrides,

        /// Also write the JSON report to this file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Print pipeline metrics to stderr
        #[arg(long)]
        metrics: bool,
    },

    /// Show CPU utilization aggregated per window
    Windows {
        /// Event log database
        #[arg(long)]
        db: PathBuf,

        /// Window duration in seconds
        #[arg(long)]
        window_secs: Option<f64>,
    },

    /// Print the effective pipeline configuration
    Config {
        #[command(flatten)]
        overrides: config::Overrides,
    },
}

fn init_tracing(json: bool, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json, cli.verbose);

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Curve {
            db,
            overrides,
            output,
            metrics,
        } => {
            let config = config::load(config_path, &overrides)?;
            curve::show_curve(&db, config, output.as_deref(), metrics, cli.format)?;
        }
        Commands::Windows { db, window_secs } => {
            let overrides = config::Overrides {
                window_secs,
                ..config::Overrides::default()
            };
            let config = config::load(config_path, &overrides)?;
            windows::show_windows(&db, &config, cli.format)?;
        }
        Commands::Config { overrides } => {
            let config = config::load(config_path, &overrides)?;
            inspect::show_config(&config, cli.format)?;
        }
    }

    Ok(())
}
