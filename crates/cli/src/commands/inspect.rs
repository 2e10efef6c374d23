//! Configuration inspection command

use anyhow::Result;
use loadcurve_lib::PipelineConfig;

use crate::output::{print_header, OutputFormat};

/// Print the effective pipeline configuration as JSON
pub fn show_config(config: &PipelineConfig, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Table = format {
        print_header("Effective configuration");
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
