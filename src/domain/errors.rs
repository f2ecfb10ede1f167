//! Domain error types
//!
//! This module defines the error hierarchy for Masquerade.
//! All errors are domain-specific and don't expose third-party types; driver,
//! parser and I/O failures are flattened into message strings at the boundary.
//!
//! Schema drift and formatter resolution misses are deliberately absent here:
//! they never abort a run and are recorded in the run summary instead.

use thiserror::Error;

/// Main Masquerade error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum MasqueradeError {
    /// Configuration-related errors (fatal, raised before any row is touched)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A column names a provider identifier that is not a generator provider
    #[error("Provider type error: {0}")]
    ProviderType(String),

    /// Value generation failed in a way that cannot be skipped
    #[error("Generation error: {0}")]
    Generation(#[from] GeneratorError),

    /// Database-related errors (queries, statements, row decoding)
    #[error("Database error: {0}")]
    Database(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl MasqueradeError {
    /// Whether the error was raised while reading or validating configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, MasqueradeError::Configuration(_))
    }

    /// Whether the error came from reaching the database server
    pub fn is_connection(&self) -> bool {
        matches!(self, MasqueradeError::Connection(_))
    }
}

/// Errors raised by a generator handle while producing a value
///
/// `UnknownFormatter` and `InvalidArguments` are resolution misses: the
/// transformer omits the column and carries on. The overflow variants mean a
/// modifier could not be satisfied and are fatal for the execution unit.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeneratorError {
    /// No formatter with this name is registered on the handle
    #[error("Unknown formatter '{0}'")]
    UnknownFormatter(String),

    /// The formatter exists but rejected its arguments
    #[error("Invalid arguments for formatter '{formatter}': {message}")]
    InvalidArguments { formatter: String, message: String },

    /// `unique` exhausted its retry budget
    #[error("Maximum retries of {attempts} reached without finding a unique value for '{formatter}'")]
    UniqueOverflow { formatter: String, attempts: usize },

    /// `valid` exhausted its retry budget
    #[error("Maximum retries of {attempts} reached without finding a valid value for '{formatter}'")]
    ValidOverflow { formatter: String, attempts: usize },
}

impl GeneratorError {
    /// Creates an invalid-arguments error for `formatter`
    pub fn invalid_args(formatter: &str, message: impl Into<String>) -> Self {
        GeneratorError::InvalidArguments {
            formatter: formatter.to_string(),
            message: message.into(),
        }
    }

    /// True when the column should be omitted rather than the run aborted
    pub fn is_resolution_miss(&self) -> bool {
        matches!(
            self,
            GeneratorError::UnknownFormatter(_) | GeneratorError::InvalidArguments { .. }
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for MasqueradeError {
    fn from(err: std::io::Error) -> Self {
        MasqueradeError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for MasqueradeError {
    fn from(err: serde_json::Error) -> Self {
        MasqueradeError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for MasqueradeError {
    fn from(err: toml::de::Error) -> Self {
        MasqueradeError::Configuration(format!("TOML parse error: {err}"))
    }
}
