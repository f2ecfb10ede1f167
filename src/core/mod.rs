//! Core anonymization engine.
//!
//! # Modules
//!
//! - [`schema`] - Schema drift detection before a table is touched
//! - [`transform`] - Keyset scan and per-row updates of one table
//! - [`progress`] - Progress events, redraw cadence and sinks
//! - [`orchestrator`] - Group selection and concurrent execution units
//! - [`summary`] - Run, group and table results
//!
//! # Workflow
//!
//! 1. **Resolve**: merge the platform configuration with local overrides
//! 2. **Select**: pick groups from the `--group` filter (all when empty)
//! 3. **Check**: drop missing tables and columns with a warning
//! 4. **Null**: clear `nullColumnBeforeRun` columns once per table
//! 5. **Update**: walk rows by primary key and write generated values
//! 6. **Report**: print and log the run summary
//!
//! # Example
//!
//! ```rust,no_run
//! use masquerade::config::{load_config, ConfigResolver};
//! use masquerade::core::orchestrator::{GroupOrchestrator, RunContext, RunOptions};
//! use masquerade::core::progress::ConsoleSink;
//! use masquerade::adapters::database::create_connection_factory;
//! use masquerade::generator::ProviderCatalog;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("masquerade.toml")?;
//! let platform = ConfigResolver::from_config(&config).resolve(config.platform.as_deref())?;
//! let factory = create_connection_factory(&config.database, platform.groups.len())?;
//!
//! let ctx = RunContext::new(factory, ProviderCatalog::builtin(), RunOptions::from_config(&config));
//! let orchestrator = GroupOrchestrator::new(ctx, Arc::new(ConsoleSink::new(false)));
//! let summary = orchestrator.run(&platform, &config.groups).await;
//!
//! println!("Rows updated: {}", summary.rows_updated());
//! # Ok(())
//! # }
//! ```

pub mod orchestrator;
pub mod progress;
pub mod schema;
pub mod summary;
pub mod transform;
