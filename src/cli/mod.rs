//! CLI interface and argument parsing
//!
//! Command-line interface for Masquerade using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Default application configuration file
pub const DEFAULT_CONFIG_PATH: &str = "masquerade.toml";

/// Masquerade - database anonymization
#[derive(Parser, Debug)]
#[command(name = "masquerade")]
#[command(version, about, long_about = None)]
#[command(author = "Masquerade Contributors")]
pub struct Cli {
    /// Path to configuration file [default: masquerade.toml]
    #[arg(short, long, global = true, env = "MASQUERADE_CONFIG")]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Configuration file to load
    pub fn config_path(&self) -> &str {
        self.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH)
    }

    /// An explicitly named configuration file must exist
    pub fn config_required(&self) -> bool {
        self.config.is_some()
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Anonymize the configured tables of a database
    Run(commands::run::RunArgs),

    /// Resolve and print the platform configuration without touching a database
    ValidateConfig(commands::validate::ValidateArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["masquerade", "run"]);
        assert_eq!(cli.config_path(), "masquerade.toml");
        assert!(!cli.config_required());
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["masquerade", "--config", "custom.toml", "run"]);
        assert_eq!(cli.config_path(), "custom.toml");
        assert!(cli.config_required());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["masquerade", "run", "--log-level", "debug"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_run_options() {
        let cli = Cli::parse_from([
            "masquerade",
            "run",
            "--platform",
            "magento2",
            "--host",
            "db",
            "--port",
            "5433",
            "--group",
            "customer, sales",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.platform.as_deref(), Some("magento2"));
        assert_eq!(args.port, Some(5433));
        assert_eq!(args.group.as_deref(), Some("customer, sales"));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["masquerade", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }
}
