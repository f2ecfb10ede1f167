//! Domain models and types for Masquerade.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **The resolved platform model** ([`PlatformConfig`], [`GroupSpec`], [`TableSpec`], [`ColumnSpec`])
//! - **Formatter declarations** ([`FormatterSpec`], [`Modifiers`])
//! - **Dynamically typed values** ([`Value`])
//! - **Error types** ([`MasqueradeError`], [`GeneratorError`])
//! - **Result type alias** ([`Result`])
//!
//! Nothing in here touches the database or the filesystem.

pub mod context;
pub mod errors;
pub mod result;
pub mod table;
pub mod value;

// Re-export commonly used types for convenience
pub use errors::{GeneratorError, MasqueradeError};
pub use result::Result;
pub use table::{
    ColumnSpec, FormatterSpec, GroupSpec, Modifiers, PlatformConfig, TableSpec,
    DEFAULT_PRIMARY_KEY,
};
pub use value::Value;
