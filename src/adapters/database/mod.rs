//! Database abstraction layer
//!
//! Trait-based access to the target database so the engine can run against
//! PostgreSQL in production and an in-memory store in tests.

pub mod factory;
pub mod traits;

pub use factory::{create_connection_factory, Driver};
pub use traits::{Connection, ConnectionFactory, RowStore, SchemaInspector, UpdateSet};
