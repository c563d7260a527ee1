//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::check::CheckArgs;
use super::commands::replay::ReplayArgs;

#[derive(Parser)]
#[command(name = "specweave")]
#[command(about = "Specweave - reconcile UI specifications with their implementations", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .specweave/config.yaml and local.yaml)
    #[arg(short, long, global = true, env = "SPECWEAVE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the consistency analyzers once over a spec and its implementation
    Check(CheckArgs),

    /// Run the convergence loop against a recorded session script
    Replay(ReplayArgs),
}
