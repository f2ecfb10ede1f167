//! PostgreSQL client implementation
//!
//! Owns the `deadpool-postgres` pool. Every execution unit checks out one
//! pooled connection and keeps it until the unit ends, so session settings
//! such as `session_replication_role` stay scoped to that unit.

use crate::adapters::database::traits::{Connection, ConnectionFactory};
use crate::adapters::postgresql::adapter::PostgreSQLConnection;
use crate::config::schema::DatabaseConfig;
use crate::domain::{MasqueradeError, Result};
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::NoTls;

/// PostgreSQL client for Masquerade
pub struct PostgreSQLClient {
    /// Connection pool
    pool: Pool,

    /// Table name prefix applied by every connection
    prefix: String,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// The pool is created lazily; no connection is opened here.
    ///
    /// # Arguments
    ///
    /// * `config` - Database settings
    /// * `max_connections` - Pool size, one per execution unit
    ///
    /// # Errors
    ///
    /// Returns an error if the charset is not supported or the pool cannot be built.
    pub fn new(config: &DatabaseConfig, max_connections: usize) -> Result<Self> {
        let pg_config = connection_config(config)?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let pool = Pool::builder(manager)
            .max_size(max_connections.max(1))
            .runtime(Runtime::Tokio1)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .build()
            .map_err(|e| {
                MasqueradeError::Connection(format!("Failed to create connection pool: {e}"))
            })?;

        Ok(Self {
            pool,
            prefix: config.prefix.clone(),
        })
    }

    /// Get a connection from the pool
    ///
    /// # Errors
    ///
    /// Returns `MasqueradeError::Connection` if a connection cannot be obtained.
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            MasqueradeError::Connection(format!("Failed to get connection from pool: {e}"))
        })
    }
}

/// Translates [`DatabaseConfig`] into a `tokio_postgres::Config`
fn connection_config(config: &DatabaseConfig) -> Result<tokio_postgres::Config> {
    let encoding = match config.charset.trim().to_ascii_lowercase().as_str() {
        "utf8" | "utf-8" | "utf8mb4" => "UTF8",
        other => {
            return Err(MasqueradeError::Configuration(format!(
                "Unsupported charset '{other}'; only utf8 is supported"
            )))
        }
    };

    let mut pg = tokio_postgres::Config::new();
    pg.host(config.host.as_deref().unwrap_or("localhost"))
        .port(config.port)
        .dbname(config.database.as_deref().unwrap_or_default())
        .user(config.username.as_deref().unwrap_or_default())
        .application_name("masquerade")
        .connect_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .options(&format!("-c client_encoding={encoding}"));

    if let Some(password) = &config.password {
        pg.password(password.expose_secret().as_ref());
    }

    Ok(pg)
}

#[async_trait]
impl ConnectionFactory for PostgreSQLClient {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        let object = self.get_connection().await?;
        Ok(Box::new(PostgreSQLConnection::new(object, self.prefix.clone())))
    }

    async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;

        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| MasqueradeError::Connection(format!("Connection test failed: {e}")))?;

        tracing::info!("PostgreSQL connection test successful");
        Ok(())
    }
}
