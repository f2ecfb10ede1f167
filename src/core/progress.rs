//! Progress reporting
//!
//! Execution units emit [`ProgressEvent`]s to a [`ProgressSink`]. A single
//! in-process group writes straight to the console; worker tasks write into
//! a channel that the parent drains and prints as events arrive.

use std::io::Write;
use tokio::sync::mpsc;

/// Rows between two progress redraws for a table of `total` rows
///
/// Tiered so that every table redraws a comparable number of times:
/// 10% below 100 rows, then 1%, 0.1%, 0.01% and 0.001% per order of
/// magnitude. Never less than one.
pub fn redraw_frequency(total: u64) -> u64 {
    let divisor: u64 = match total {
        0..=99 => 10,
        100..=999 => 100,
        1_000..=9_999 => 1_000,
        10_000..=99_999 => 10_000,
        _ => 100_000,
    };
    total.div_ceil(divisor).max(1)
}

/// Something worth telling the operator
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    GroupStarted {
        group: String,
        tables: usize,
    },
    TableStarted {
        group: String,
        table: String,
        total: u64,
    },
    Advanced {
        group: String,
        table: String,
        done: u64,
        total: u64,
    },
    TableFinished {
        group: String,
        table: String,
        updated: u64,
    },
    Warning {
        group: String,
        message: String,
    },
    GroupFinished {
        group: String,
        error: Option<String>,
    },
}

impl ProgressEvent {
    pub fn group(&self) -> &str {
        match self {
            ProgressEvent::GroupStarted { group, .. }
            | ProgressEvent::TableStarted { group, .. }
            | ProgressEvent::Advanced { group, .. }
            | ProgressEvent::TableFinished { group, .. }
            | ProgressEvent::Warning { group, .. }
            | ProgressEvent::GroupFinished { group, .. } => group,
        }
    }
}

/// Receiver of progress events; observational only
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Prints events to stdout
///
/// With `inline` set, row counts are redrawn in place on one line. Otherwise
/// every event is a line of its own, prefixed with the group name, which
/// keeps interleaved output of concurrent groups readable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
    inline: bool,
}

impl ConsoleSink {
    pub fn new(inline: bool) -> Self {
        Self { inline }
    }

    fn render(&self, event: &ProgressEvent) -> String {
        match event {
            ProgressEvent::GroupStarted { group, tables } => {
                format!("🚀 [{group}] Anonymizing {tables} table(s)")
            }
            ProgressEvent::TableStarted { group, table, total } => {
                format!("📋 [{group}] Updating {table} ({total} rows)")
            }
            ProgressEvent::Advanced {
                group,
                table,
                done,
                total,
            } => {
                let pct = if *total == 0 { 100 } else { done * 100 / total };
                format!("   [{group}] {table} {done}/{total} ({pct}%)")
            }
            ProgressEvent::TableFinished {
                group,
                table,
                updated,
            } => format!("✅ [{group}] {table}: {updated} rows updated"),
            ProgressEvent::Warning { group, message } => format!("⚠️  [{group}] {message}"),
            ProgressEvent::GroupFinished { group, error: None } => {
                format!("🏁 [{group}] Finished")
            }
            ProgressEvent::GroupFinished {
                group,
                error: Some(error),
            } => format!("❌ [{group}] Failed: {error}"),
        }
    }
}

impl ProgressSink for ConsoleSink {
    fn emit(&self, event: ProgressEvent) {
        let line = self.render(&event);
        let mut out = std::io::stdout().lock();
        let _ = match (&event, self.inline) {
            (ProgressEvent::Advanced { done, total, .. }, true) if done < total => {
                write!(out, "\r{line}").and_then(|_| out.flush())
            }
            (ProgressEvent::Advanced { .. }, true) => writeln!(out, "\r{line}"),
            _ => writeln!(out, "{line}"),
        };
    }
}

/// Forwards events into a channel owned by the parent
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        // The parent only stops listening once every worker is done
        let _ = self.tx.send(event);
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Decides when a table's progress is redrawn
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    cadence: u64,
    done: u64,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            cadence: redraw_frequency(total),
            done: 0,
        }
    }

    /// Counts one row; returns the row count when a redraw is due
    pub fn advance(&mut self) -> Option<u64> {
        self.done += 1;
        (self.done % self.cadence == 0 || self.done == self.total).then_some(self.done)
    }

    pub fn done(&self) -> u64 {
        self.done
    }
}
