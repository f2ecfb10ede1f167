//! External system integrations for Masquerade.
//!
//! - [`database`] - Database abstraction layer (trait-based)
//! - [`postgresql`] - PostgreSQL implementation
//!
//! The engine only talks to the traits in [`database`], so tests can run it
//! against an in-memory store.

pub mod database;
pub mod postgresql;
