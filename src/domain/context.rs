//! Error context extension trait
//!
//! Works like `anyhow::Context` for `Result<T, MasqueradeError>`, except that
//! the error keeps its variant: a configuration failure with context is still
//! a configuration failure, so the CLI can map it to the right exit code.
//!
//! # Examples
//!
//! ```rust
//! use masquerade::domain::Result;
//! use masquerade::domain::context::ResultExt;
//!
//! fn read_platform_file(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
//! }
//! ```

use crate::domain::errors::MasqueradeError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Prefix the error message with `context`
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Like [`ResultExt::context`], but the context is only built on error
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<MasqueradeError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| prefix(e.into(), &context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| prefix(e.into(), &f()))
    }
}

fn prefix(err: MasqueradeError, context: &dyn std::fmt::Display) -> MasqueradeError {
    match err {
        MasqueradeError::Configuration(msg) => {
            MasqueradeError::Configuration(format!("{context}: {msg}"))
        }
        MasqueradeError::ProviderType(msg) => {
            MasqueradeError::ProviderType(format!("{context}: {msg}"))
        }
        MasqueradeError::Database(msg) => MasqueradeError::Database(format!("{context}: {msg}")),
        MasqueradeError::Connection(msg) => {
            MasqueradeError::Connection(format!("{context}: {msg}"))
        }
        MasqueradeError::Serialization(msg) => {
            MasqueradeError::Serialization(format!("{context}: {msg}"))
        }
        MasqueradeError::Io(msg) => MasqueradeError::Io(format!("{context}: {msg}")),
        // Generation carries a structured error; keep it intact
        other @ MasqueradeError::Generation(_) => other,
        MasqueradeError::Other(msg) => MasqueradeError::Other(format!("{context}: {msg}")),
    }
}
