//! Connection factory selection
//!
//! Picks the database backend from the configured driver name.

use crate::adapters::database::traits::ConnectionFactory;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::DatabaseConfig;
use crate::domain::{MasqueradeError, Result};
use std::sync::Arc;

/// Database backends Masquerade can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    PostgreSQL,
}

impl Driver {
    /// Parses a configured driver name
    ///
    /// # Errors
    ///
    /// Returns `MasqueradeError::Configuration` for unknown or unsupported drivers.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pgsql" | "postgres" | "postgresql" => Ok(Driver::PostgreSQL),
            "mysql" | "mariadb" | "sqlite" | "sqlsrv" => Err(MasqueradeError::Configuration(
                format!("Driver '{name}' is not supported by this build; use 'pgsql'"),
            )),
            other => Err(MasqueradeError::Configuration(format!(
                "Unknown database driver '{other}'"
            ))),
        }
    }
}

/// Create a connection factory based on the configuration
///
/// # Arguments
///
/// * `config` - Database settings after CLI and environment overrides
/// * `max_connections` - Upper bound of simultaneously open connections,
///   one per execution unit
///
/// # Errors
///
/// Returns `MasqueradeError::Configuration` if host, database or username are
/// missing, or the driver/charset is not supported.
pub fn create_connection_factory(
    config: &DatabaseConfig,
    max_connections: usize,
) -> Result<Arc<dyn ConnectionFactory>> {
    config
        .require_connection_settings()
        .map_err(MasqueradeError::Configuration)?;

    match Driver::parse(&config.driver)? {
        Driver::PostgreSQL => {
            tracing::info!(
                host = config.host.as_deref().unwrap_or_default(),
                port = config.port,
                database = config.database.as_deref().unwrap_or_default(),
                max_connections,
                "Creating PostgreSQL connection pool"
            );
            let client = PostgreSQLClient::new(config, max_connections)?;
            Ok(Arc::new(client) as Arc<dyn ConnectionFactory>)
        }
    }
}
