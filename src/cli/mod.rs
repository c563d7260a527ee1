//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use anyhow::Context;

use crate::adapters::RegexExtractor;
use crate::domain::models::AnalysisConfig;
use crate::services::AnalyzerCluster;

/// The standard analyzer cluster wired to the regex source extractor.
pub fn analyzer_cluster(config: &AnalysisConfig) -> anyhow::Result<AnalyzerCluster> {
    let extractor =
        RegexExtractor::from_config(config).context("Failed to compile the source extractor")?;
    Ok(AnalyzerCluster::standard(config, Box::new(extractor)))
}

/// Print a command error and exit with status 1.
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}
