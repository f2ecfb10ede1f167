//! Run summary and reporting
//!
//! Tracks what each group did: tables processed or skipped, rows updated,
//! columns dropped because of schema drift, and columns whose formatter
//! could not be resolved.

use std::time::Duration;

/// Result of anonymizing one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSummary {
    /// Logical table name (without prefix)
    pub table: String,

    /// Row count reported before the first batch
    pub total_rows: u64,

    /// Rows visited by the keyset scan
    pub rows_visited: u64,

    /// Rows that received an `UPDATE`
    pub rows_updated: u64,

    /// Table missing from the live schema
    pub skipped: bool,

    /// Configured columns missing from the live schema
    pub missing_columns: Vec<String>,

    /// Columns left untouched because their formatter could not be resolved
    pub omitted_columns: Vec<String>,

    /// Columns nulled before the first batch
    pub nulled_columns: Vec<String>,
}

impl TableSummary {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Summary of a table that does not exist
    pub fn skipped(table: impl Into<String>) -> Self {
        Self {
            skipped: true,
            ..Self::new(table)
        }
    }
}

/// Result of one execution unit
#[derive(Debug, Clone, Default)]
pub struct GroupSummary {
    pub group: String,
    pub tables: Vec<TableSummary>,
    pub duration: Duration,

    /// Fatal error that stopped the group, if any
    pub error: Option<String>,
}

impl GroupSummary {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            ..Self::default()
        }
    }

    pub fn failed(group: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(group)
        }
    }

    pub fn is_successful(&self) -> bool {
        self.error.is_none()
    }

    pub fn tables_processed(&self) -> usize {
        self.tables.iter().filter(|t| !t.skipped).count()
    }

    pub fn tables_skipped(&self) -> usize {
        self.tables.iter().filter(|t| t.skipped).count()
    }

    pub fn rows_updated(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_updated).sum()
    }
}

/// Summary of a whole run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub platform: String,
    pub groups: Vec<GroupSummary>,

    /// Requested groups that are not configured
    pub unknown_groups: Vec<String>,

    pub duration: Duration,
}

impl RunSummary {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// True when no group failed
    pub fn is_successful(&self) -> bool {
        self.groups.iter().all(GroupSummary::is_successful)
    }

    pub fn failed_groups(&self) -> impl Iterator<Item = &GroupSummary> {
        self.groups.iter().filter(|g| !g.is_successful())
    }

    pub fn group(&self, name: &str) -> Option<&GroupSummary> {
        self.groups.iter().find(|g| g.group == name)
    }

    pub fn rows_updated(&self) -> u64 {
        self.groups.iter().map(GroupSummary::rows_updated).sum()
    }

    pub fn tables_processed(&self) -> usize {
        self.groups.iter().map(GroupSummary::tables_processed).sum()
    }

    pub fn tables_skipped(&self) -> usize {
        self.groups.iter().map(GroupSummary::tables_skipped).sum()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            platform = %self.platform,
            groups = self.groups.len(),
            tables_processed = self.tables_processed(),
            tables_skipped = self.tables_skipped(),
            rows_updated = self.rows_updated(),
            duration_secs = self.duration.as_secs(),
            "Anonymization completed"
        );

        for name in &self.unknown_groups {
            tracing::warn!(group = %name, "Requested group is not configured");
        }

        for group in &self.groups {
            for table in &group.tables {
                if !table.missing_columns.is_empty() || !table.omitted_columns.is_empty() {
                    tracing::warn!(
                        group = %group.group,
                        table = %table.table,
                        missing = ?table.missing_columns,
                        omitted = ?table.omitted_columns,
                        "Table completed with untouched columns"
                    );
                }
            }
        }

        for group in self.failed_groups() {
            tracing::error!(
                group = %group.group,
                error = group.error.as_deref().unwrap_or_default(),
                "Group failed"
            );
        }
    }
}
