// Masquerade - Database Anonymization Tool
// Copyright (c) 2025 Masquerade Contributors
// Licensed under the MIT License

use masquerade::cli::{Cli, Commands};
use masquerade::config::{load_config_or_default, LoggingConfig};
use masquerade::logging::init_logging;
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    // Optional; a missing .env is ignored
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let loaded = load_config_or_default(cli.config_path(), cli.config_required());

    // Logging comes up before config errors are reported, so fall back to defaults
    let logging_config = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_else(|_| LoggingConfig::default());
    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| logging_config.level.clone());

    let guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(2);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = cli.config_path(),
        "Masquerade - database anonymization"
    );

    let exit_code = match &cli.command {
        Commands::Run(args) => args.execute(loaded).await,
        Commands::ValidateConfig(args) => args.execute(cli.config_path(), loaded).await,
    }
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "Command execution failed");
        eprintln!("Error: {e}");
        5
    });

    // process::exit skips destructors; flush file logs first
    drop(guard);
    process::exit(exit_code);
}
