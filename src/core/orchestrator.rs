//! Group orchestration
//!
//! A single selected group runs in-process. Several groups run as one tokio
//! task each, bounded by a semaphore, with their progress streamed back to
//! the parent over a channel. A failing group never stops its siblings.

use crate::adapters::database::traits::ConnectionFactory;
use crate::config::schema::{ForeignKeyPolicy, MasqueradeConfig};
use crate::core::progress::{ChannelSink, ProgressEvent, ProgressSink};
use crate::core::summary::{GroupSummary, RunSummary};
use crate::core::transform::{ChunkedRowTransformer, TransformOptions};
use crate::domain::table::{GroupSpec, PlatformConfig};
use crate::generator::locale::Locale;
use crate::generator::providers::ProviderCatalog;
use crate::generator::resolver::GeneratorResolver;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

/// Settings shared by every execution unit of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub transform: TransformOptions,
    pub locale: Locale,
    pub seed: Option<u64>,
    /// 0 means one worker per selected group
    pub max_parallel_groups: usize,
}

impl RunOptions {
    pub fn from_config(config: &MasqueradeConfig) -> Self {
        Self {
            transform: TransformOptions::from_run(&config.run),
            locale: Locale::resolve(&config.locale),
            seed: config.run.seed,
            max_parallel_groups: config.run.max_parallel_groups,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            transform: TransformOptions::default(),
            locale: Locale::default(),
            seed: None,
            max_parallel_groups: 0,
        }
    }
}

/// Everything an execution unit needs besides its group
pub struct RunContext {
    factory: Arc<dyn ConnectionFactory>,
    catalog: ProviderCatalog,
    options: RunOptions,
}

impl RunContext {
    pub fn new(
        factory: Arc<dyn ConnectionFactory>,
        catalog: ProviderCatalog,
        options: RunOptions,
    ) -> Self {
        Self {
            factory,
            catalog,
            options,
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Generator seed of one group
    ///
    /// Derived from the run seed and the group name so a group produces the
    /// same values whether it runs alone or next to others.
    pub fn seed_for(&self, group: &str) -> Option<u64> {
        self.options
            .seed
            .map(|seed| seed.wrapping_add(stable_hash(group)))
    }
}

/// FNV-1a; stable across runs and platforms
fn stable_hash(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Number of workers for `selected` groups
pub fn worker_count(selected: usize, max_parallel_groups: usize) -> usize {
    let workers = if max_parallel_groups > 0 {
        max_parallel_groups.min(selected)
    } else {
        selected
    };
    workers.max(1)
}

/// Runs the selected groups of a platform
pub struct GroupOrchestrator {
    ctx: Arc<RunContext>,
    sink: Arc<dyn ProgressSink>,
}

impl GroupOrchestrator {
    pub fn new(ctx: RunContext, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            sink,
        }
    }

    /// Anonymizes the groups of `platform` matching `filter`
    ///
    /// An empty filter selects every group. Filter entries that name no
    /// configured group are reported and ignored. Group failures are recorded
    /// in the returned summary rather than returned as errors.
    pub async fn run(&self, platform: &PlatformConfig, filter: &[String]) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::new(&platform.platform);

        let (selected, unknown) = platform.select(filter);
        for name in &unknown {
            tracing::warn!(group = %name, "Group is not configured, ignoring");
            self.sink.emit(ProgressEvent::Warning {
                group: name.clone(),
                message: format!("Group {name} is not configured, ignoring"),
            });
        }
        summary.unknown_groups = unknown;

        summary.groups = match selected.as_slice() {
            [] => {
                tracing::warn!(platform = %platform.platform, "No groups to anonymize");
                Vec::new()
            }
            [group] => vec![run_group(&self.ctx, group, self.sink.as_ref()).await],
            groups => self.run_concurrently(groups).await,
        };

        let summary = summary.with_duration(started.elapsed());
        summary.log_summary();
        summary
    }

    async fn run_concurrently(&self, groups: &[&GroupSpec]) -> Vec<GroupSummary> {
        let workers = worker_count(groups.len(), self.ctx.options.max_parallel_groups);
        tracing::info!(groups = groups.len(), workers, "Starting group workers");

        let semaphore = Arc::new(Semaphore::new(workers));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();

        for group in groups {
            let group = (*group).clone();
            let ctx = Arc::clone(&self.ctx);
            let semaphore = Arc::clone(&semaphore);
            let sink = ChannelSink::new(tx.clone());

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return GroupSummary::failed(&group.name, "worker pool closed");
                };
                run_group(&ctx, &group, &sink).await
            });
        }
        drop(tx);

        // Ends once every worker has dropped its sender
        while let Some(event) = rx.recv().await {
            self.sink.emit(event);
        }

        let mut results = Vec::with_capacity(groups.len());
        let mut crash = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(summary) => results.push(summary),
                Err(e) => {
                    tracing::error!(error = %e, "Group worker terminated unexpectedly");
                    crash.get_or_insert_with(|| e.to_string());
                }
            }
        }

        for group in groups {
            if !results.iter().any(|r| r.group == group.name) {
                let reason = crash
                    .clone()
                    .unwrap_or_else(|| "worker terminated unexpectedly".to_string());
                results.push(GroupSummary::failed(&group.name, reason));
            }
        }
        results.sort_by_key(|r| groups.iter().position(|g| g.name == r.group));
        results
    }
}

/// Runs one group on its own connection
///
/// Tables run in configuration order; the first error stops the group.
pub async fn run_group(
    ctx: &RunContext,
    group: &GroupSpec,
    sink: &dyn ProgressSink,
) -> GroupSummary {
    let started = Instant::now();
    let mut summary = GroupSummary::new(&group.name);

    tracing::info!(group = %group.name, tables = group.tables.len(), "Group started");
    sink.emit(ProgressEvent::GroupStarted {
        group: group.name.clone(),
        tables: group.tables.len(),
    });

    let connection = match ctx.factory.connect().await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!(group = %group.name, error = %e, "Could not open connection");
            summary.error = Some(e.to_string());
            summary.duration = started.elapsed();
            sink.emit(ProgressEvent::GroupFinished {
                group: group.name.clone(),
                error: summary.error.clone(),
            });
            return summary;
        }
    };

    let relax = ctx.options.transform.foreign_keys == ForeignKeyPolicy::DisabledForConnection;
    if relax {
        if let Err(e) = connection.set_foreign_key_checks(false).await {
            tracing::warn!(group = %group.name, error = %e, "Could not disable foreign key checks");
            sink.emit(ProgressEvent::Warning {
                group: group.name.clone(),
                message: format!("Could not disable foreign key checks: {e}"),
            });
        }
    }

    let mut resolver = GeneratorResolver::new(
        ctx.catalog.clone(),
        ctx.options.locale,
        ctx.seed_for(&group.name),
    );
    {
        let mut transformer = ChunkedRowTransformer::new(
            connection.as_ref(),
            &mut resolver,
            sink,
            &group.name,
            ctx.options.transform,
        );

        for table in &group.tables {
            match transformer.run_table(table).await {
                Ok(table_summary) => summary.tables.push(table_summary),
                Err(e) => {
                    tracing::error!(
                        group = %group.name,
                        table = %table.name,
                        error = %e,
                        "Table failed, stopping group"
                    );
                    summary.error = Some(format!("{}: {e}", table.name));
                    break;
                }
            }
        }
    }

    if relax {
        if let Err(e) = connection.set_foreign_key_checks(true).await {
            tracing::warn!(group = %group.name, error = %e, "Could not re-enable foreign key checks");
        }
    }

    summary.duration = started.elapsed();
    tracing::info!(
        group = %group.name,
        rows_updated = summary.rows_updated(),
        generator_handles = resolver.handle_count(),
        duration_ms = summary.duration.as_millis() as u64,
        "Group finished"
    );
    sink.emit(ProgressEvent::GroupFinished {
        group: group.name.clone(),
        error: summary.error.clone(),
    });
    summary
}
