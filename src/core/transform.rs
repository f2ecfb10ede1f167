//! Chunked row transformation
//!
//! Anonymizes one table at a time: schema check, optional null-before-run
//! step, then a keyset scan over the primary key in fixed-size batches with
//! one `UPDATE` per row.

use crate::adapters::database::traits::{Connection, UpdateSet};
use crate::config::schema::{ForeignKeyPolicy, RunConfig};
use crate::core::progress::{ProgressEvent, ProgressSink, ProgressTracker};
use crate::core::schema::{SchemaCheck, SchemaValidator};
use crate::core::summary::TableSummary;
use crate::domain::table::TableSpec;
use crate::domain::value::Value;
use crate::domain::Result;
use crate::generator::resolver::{GeneratorResolver, Resolution};
use crate::{log_batch_processing, log_table_complete, log_table_start};
use std::collections::HashSet;
use std::time::Instant;

/// Per-run knobs of the transformer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    pub batch_size: usize,
    pub foreign_keys: ForeignKeyPolicy,
}

impl TransformOptions {
    pub fn from_run(run: &RunConfig) -> Self {
        Self {
            batch_size: run.batch_size,
            foreign_keys: run.foreign_key_checks,
        }
    }
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            foreign_keys: ForeignKeyPolicy::default(),
        }
    }
}

/// Anonymizes the tables of one group over one connection
pub struct ChunkedRowTransformer<'a> {
    connection: &'a dyn Connection,
    resolver: &'a mut GeneratorResolver,
    sink: &'a dyn ProgressSink,
    group: &'a str,
    options: TransformOptions,
}

impl<'a> ChunkedRowTransformer<'a> {
    pub fn new(
        connection: &'a dyn Connection,
        resolver: &'a mut GeneratorResolver,
        sink: &'a dyn ProgressSink,
        group: &'a str,
        options: TransformOptions,
    ) -> Self {
        Self {
            connection,
            resolver,
            sink,
            group,
            options,
        }
    }

    fn warn(&self, message: String) {
        self.sink.emit(ProgressEvent::Warning {
            group: self.group.to_string(),
            message,
        });
    }

    /// Anonymizes `table`
    ///
    /// Missing tables and columns are reported and skipped. Columns whose
    /// formatter cannot be resolved are left untouched, with one warning per
    /// column.
    ///
    /// # Errors
    ///
    /// Returns an error on database failures, unknown providers, and
    /// exhausted `unique`/`valid` retries.
    pub async fn run_table(&mut self, table: &TableSpec) -> Result<TableSummary> {
        let started = Instant::now();

        let (working, missing, protected) =
            match SchemaValidator::new(self.connection).check(table).await? {
                SchemaCheck::Skip => {
                    self.warn(format!("Table {} not found, skipping", table.name));
                    return Ok(TableSummary::skipped(&table.name));
                }
                SchemaCheck::Ready {
                    table,
                    missing,
                    protected,
                } => (table, missing, protected),
            };

        for column in &missing {
            self.warn(format!(
                "Column {column} not found in table {}, skipping",
                working.name
            ));
        }
        for column in &protected {
            self.warn(format!(
                "Column {column} is the primary key of {} and is never rewritten",
                working.name
            ));
        }

        let mut summary = TableSummary {
            missing_columns: missing,
            ..TableSummary::new(&working.name)
        };

        summary.nulled_columns = self.null_before_run(&working).await?;

        let total = self.connection.count(&working.name).await?;
        summary.total_rows = total;
        log_table_start!(self.group, working.name, total);
        self.sink.emit(ProgressEvent::TableStarted {
            group: self.group.to_string(),
            table: working.name.clone(),
            total,
        });

        let mut tracker = ProgressTracker::new(total);
        let mut omitted: HashSet<String> = HashSet::new();
        let mut last: Option<Value> = None;
        let batch_size = self.options.batch_size.max(1);

        loop {
            let keys = self
                .connection
                .fetch_keys(&working.name, &working.primary_key, last.as_ref(), batch_size)
                .await?;
            if keys.is_empty() {
                break;
            }

            for key in &keys {
                let fields = self.build_update(&working, &mut omitted, &mut summary)?;
                if !fields.is_empty() {
                    self.connection
                        .update(&working.name, &working.primary_key, key, &fields)
                        .await?;
                    summary.rows_updated += 1;
                }
                summary.rows_visited += 1;

                if let Some(done) = tracker.advance() {
                    self.sink.emit(ProgressEvent::Advanced {
                        group: self.group.to_string(),
                        table: working.name.clone(),
                        done,
                        total: total.max(done),
                    });
                }
            }
            log_batch_processing!(working.name, summary.rows_visited, total);

            let short = keys.len() < batch_size;
            last = keys.into_iter().next_back();
            if short {
                break;
            }
        }

        log_table_complete!(self.group, working.name, summary.rows_updated, started.elapsed());
        self.sink.emit(ProgressEvent::TableFinished {
            group: self.group.to_string(),
            table: working.name.clone(),
            updated: summary.rows_updated,
        });

        Ok(summary)
    }

    /// Resolves every working column for one row
    fn build_update(
        &mut self,
        table: &TableSpec,
        omitted: &mut HashSet<String>,
        summary: &mut TableSummary,
    ) -> Result<UpdateSet> {
        let mut fields = UpdateSet::new();
        for column in &table.columns {
            match self.resolver.resolve(column)? {
                Resolution::Value(value) => fields.set(&column.name, value),
                Resolution::Skip => {}
                Resolution::Omit(miss) => {
                    if omitted.insert(column.name.clone()) {
                        tracing::warn!(
                            group = %self.group,
                            table = %table.name,
                            column = %column.name,
                            error = %miss,
                            "Formatter could not be resolved, column left unchanged"
                        );
                        self.warn(format!(
                            "{miss}; column {} of {} left unchanged",
                            column.name, table.name
                        ));
                        summary.omitted_columns.push(column.name.clone());
                    }
                }
            }
        }
        Ok(fields)
    }

    /// Sets every `null_column_before_run` column to NULL across the table
    ///
    /// Runs once per table. Foreign key checks are relaxed around the
    /// statement when the policy asks for it.
    async fn null_before_run(&self, table: &TableSpec) -> Result<Vec<String>> {
        let nulled: Vec<String> = table.nulled_columns().map(|c| c.name.clone()).collect();
        if nulled.is_empty() {
            return Ok(nulled);
        }

        let fields = nulled
            .iter()
            .fold(UpdateSet::new(), |set, column| set.with(column.as_str(), Value::Null));

        let relax = self.options.foreign_keys == ForeignKeyPolicy::DisabledDuringNullStep;
        if relax {
            self.toggle_foreign_keys(false).await;
        }
        let result = self.connection.update_all(&table.name, &fields).await;
        if relax {
            self.toggle_foreign_keys(true).await;
        }

        let affected = result?;
        tracing::info!(
            group = %self.group,
            table = %table.name,
            columns = ?nulled,
            affected,
            "Nulled columns before run"
        );
        Ok(nulled)
    }

    async fn toggle_foreign_keys(&self, enabled: bool) {
        if let Err(e) = self.connection.set_foreign_key_checks(enabled).await {
            tracing::warn!(group = %self.group, enabled, error = %e, "Could not change foreign key checks");
            self.warn(format!("Could not change foreign key checks: {e}"));
        }
    }
}
