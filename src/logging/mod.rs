//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - human readable console output
//! - optional JSON log files with daily or hourly rotation
//! - level from `--log-level`, `MASQUERADE_LOG_LEVEL` or `RUST_LOG`
//!
//! # Example
//!
//! ```no_run
//! use masquerade::logging::init_logging;
//! use masquerade::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(group = "customer", "Group started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a table
///
/// # Example
///
/// ```no_run
/// use masquerade::log_table_start;
///
/// log_table_start!("customer", "customer_entity", 250);
/// ```
#[macro_export]
macro_rules! log_table_start {
    ($group:expr, $table:expr, $total:expr) => {
        tracing::info!(
            group = %$group,
            table = %$table,
            total_rows = $total,
            "Anonymizing table"
        );
    };
}

/// Log the completion of a table
///
/// # Example
///
/// ```no_run
/// use masquerade::log_table_complete;
/// use std::time::Duration;
///
/// log_table_complete!("customer", "customer_entity", 250, Duration::from_secs(2));
/// ```
#[macro_export]
macro_rules! log_table_complete {
    ($group:expr, $table:expr, $updated:expr, $duration:expr) => {
        tracing::info!(
            group = %$group,
            table = %$table,
            rows_updated = $updated,
            duration_ms = $duration.as_millis() as u64,
            "Table anonymized"
        );
    };
}

/// Log one processed batch
///
/// # Example
///
/// ```no_run
/// use masquerade::log_batch_processing;
///
/// log_batch_processing!("customer_entity", 100, 1000);
/// ```
#[macro_export]
macro_rules! log_batch_processing {
    ($table:expr, $current:expr, $total:expr) => {
        tracing::debug!(
            table = %$table,
            current = $current,
            total = $total,
            progress_pct = (if $total == 0 { 100.0 } else { $current as f64 / $total as f64 * 100.0 }),
            "Processed batch"
        );
    };
}
