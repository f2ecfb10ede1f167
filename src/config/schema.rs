//! Configuration schema types
//!
//! This module defines the structure of `masquerade.toml`. Every section is
//! optional; a run can be driven entirely from CLI flags and environment
//! variables.

use crate::config::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Main Masquerade configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasqueradeConfig {
    /// Platform identifier, e.g. `magento2`; selects `<platforms_dir>/<platform>/`
    #[serde(default)]
    pub platform: Option<String>,

    /// Generator locale, e.g. `en_US`
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Groups to anonymize; empty means every configured group
    #[serde(default)]
    pub groups: Vec<String>,

    /// Database connection settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Run behaviour
    #[serde(default)]
    pub run: RunConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for MasqueradeConfig {
    fn default() -> Self {
        Self {
            platform: None,
            locale: default_locale(),
            groups: Vec::new(),
            database: DatabaseConfig::default(),
            run: RunConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl MasqueradeConfig {
    /// Validates the parts of the configuration that do not depend on the run
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        if self.locale.trim().is_empty() {
            return Err("locale cannot be empty".to_string());
        }
        self.database.validate()?;
        self.run.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Platform directory holding the default group files
    pub fn platform_dir(&self, platform: &str) -> PathBuf {
        PathBuf::from(&self.run.platforms_dir).join(platform)
    }

    /// Directory holding the optional local override files
    pub fn override_dir(&self, platform: &str) -> PathBuf {
        PathBuf::from(&self.run.override_dir).join(platform)
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Driver name (`pgsql`, `postgres`, `postgresql`)
    #[serde(default = "default_driver")]
    pub driver: String,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name
    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Table name prefix applied to every configured table
    #[serde(default)]
    pub prefix: String,

    #[serde(default = "default_charset")]
    pub charset: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout_seconds")]
    pub connection_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            host: None,
            port: default_port(),
            database: None,
            username: None,
            password: None,
            prefix: String::new(),
            charset: default_charset(),
            connection_timeout_seconds: default_connection_timeout_seconds(),
        }
    }
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), String> {
        if self.driver.trim().is_empty() {
            return Err("database.driver cannot be empty".to_string());
        }
        if self.port == 0 {
            return Err("database.port must be > 0".to_string());
        }
        if self.connection_timeout_seconds == 0 {
            return Err("database.connection_timeout_seconds must be > 0".to_string());
        }
        Ok(())
    }

    /// Checks the settings a connection cannot be opened without
    ///
    /// All missing settings are reported at once, one per line.
    pub fn require_connection_settings(&self) -> Result<(), String> {
        let mut errors = Vec::new();
        if is_blank(&self.host) {
            errors.push("No host defined");
        }
        if is_blank(&self.database) {
            errors.push("No database defined");
        }
        if is_blank(&self.username) {
            errors.push("No username defined");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or_default().is_empty()
}

/// When foreign key checks are relaxed during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyPolicy {
    /// Disabled when an execution unit acquires its connection
    #[default]
    DisabledForConnection,
    /// Disabled only around the null-before-run statements
    DisabledDuringNullStep,
    /// Never touched
    Enforced,
}

impl fmt::Display for ForeignKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ForeignKeyPolicy::DisabledForConnection => "disabled_for_connection",
            ForeignKeyPolicy::DisabledDuringNullStep => "disabled_during_null_step",
            ForeignKeyPolicy::Enforced => "enforced",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ForeignKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled_for_connection" => Ok(ForeignKeyPolicy::DisabledForConnection),
            "disabled_during_null_step" => Ok(ForeignKeyPolicy::DisabledDuringNullStep),
            "enforced" => Ok(ForeignKeyPolicy::Enforced),
            other => Err(format!(
                "Invalid foreign_key_checks '{other}'. Must be one of: disabled_for_connection, disabled_during_null_step, enforced"
            )),
        }
    }
}

/// Run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Rows fetched per page
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub foreign_key_checks: ForeignKeyPolicy,

    /// Worker cap when several groups run; 0 means one worker per group
    #[serde(default)]
    pub max_parallel_groups: usize,

    /// Seed for reproducible output
    #[serde(default)]
    pub seed: Option<u64>,

    /// Directory holding one sub-directory per platform
    #[serde(default = "default_platforms_dir")]
    pub platforms_dir: String,

    /// Directory holding local per-platform overrides
    #[serde(default = "default_override_dir")]
    pub override_dir: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            foreign_key_checks: ForeignKeyPolicy::default(),
            max_parallel_groups: 0,
            seed: None,
            platforms_dir: default_platforms_dir(),
            override_dir: default_override_dir(),
        }
    }
}

impl RunConfig {
    fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 || self.batch_size > 10_000 {
            return Err(format!(
                "run.batch_size must be between 1 and 10000, got {}",
                self.batch_size
            ));
        }
        if self.platforms_dir.trim().is_empty() {
            return Err("run.platforms_dir cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.as_str()) {
            return Err(format!(
                "Invalid logging.level '{}'. Must be one of: {}",
                self.level,
                valid_levels.join(", ")
            ));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }
        Ok(())
    }
}

// Default value functions

fn default_locale() -> String {
    "en_US".to_string()
}

fn default_driver() -> String {
    "pgsql".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_charset() -> String {
    "utf8".to_string()
}

fn default_connection_timeout_seconds() -> u64 {
    30
}

fn default_batch_size() -> usize {
    100
}

fn default_platforms_dir() -> String {
    "platforms".to_string()
}

fn default_override_dir() -> String {
    "config".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
