//! Specweave CLI entry point.

use anyhow::Result;
use clap::Parser;

use specweave::cli::{Cli, Commands};
use specweave::domain::models::Config;
use specweave::infrastructure::logging::{LogConfig, LoggerImpl};
use specweave::infrastructure::ConfigLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => specweave::cli::handle_error(err, cli.json),
    };

    // keep the guard alive so file logs are flushed on exit
    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => specweave::cli::handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Check(args) => specweave::cli::commands::check::execute(args, &config, cli.json),
        Commands::Replay(args) => {
            specweave::cli::commands::replay::execute(args, &config, cli.json).await
        }
    };

    if let Err(err) = result {
        specweave::cli::handle_error(err, cli.json);
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}
