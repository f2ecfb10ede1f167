//! Configuration management for Masquerade.
//!
//! Two kinds of configuration are involved in a run:
//!
//! - The application configuration ([`MasqueradeConfig`], `masquerade.toml`):
//!   database connection, locale, run tuning and logging. Loaded by
//!   [`load_config`] with `${VAR}` substitution and `MASQUERADE_*` environment
//!   overrides; CLI flags are applied on top by the `run` command.
//! - The platform configuration: which tables and columns to anonymize and
//!   how. Resolved by [`ConfigResolver`] from `platforms/<platform>/*.toml`
//!   plus optional local overrides in `config/<platform>/*.toml`.
//!
//! # Example Configuration
//!
//! ```toml
//! platform = "magento2"
//! locale = "en_US"
//!
//! [database]
//! host = "localhost"
//! database = "shop"
//! username = "shop"
//! password = "${MASQUERADE_DB_PASSWORD}"
//!
//! [run]
//! batch_size = 100
//! foreign_key_checks = "disabled_for_connection"
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use masquerade::config::{load_config, ConfigResolver};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("masquerade.toml")?;
//! let platform = ConfigResolver::from_config(&config).resolve(config.platform.as_deref())?;
//! println!("{} groups", platform.groups.len());
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod platform;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, load_config_or_default, split_list};
pub use platform::ConfigResolver;
pub use schema::{DatabaseConfig, ForeignKeyPolicy, LoggingConfig, MasqueradeConfig, RunConfig};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
