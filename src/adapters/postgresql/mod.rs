//! PostgreSQL database integration
//!
//! Pooled connections via `deadpool-postgres`, one per execution unit.

pub mod adapter;
pub mod client;
pub mod params;

pub use adapter::PostgreSQLConnection;
pub use client::PostgreSQLClient;
