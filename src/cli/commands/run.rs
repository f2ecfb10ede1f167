//! Run command implementation
//!
//! Applies CLI overrides, resolves the platform configuration, checks the
//! database connection and anonymizes the selected groups.

use crate::adapters::database::create_connection_factory;
use crate::config::loader::split_list;
use crate::config::schema::MasqueradeConfig;
use crate::config::secret::secret_string;
use crate::config::ConfigResolver;
use crate::core::orchestrator::{worker_count, GroupOrchestrator, RunContext, RunOptions};
use crate::core::progress::ConsoleSink;
use crate::core::summary::RunSummary;
use crate::domain::Result;
use crate::generator::ProviderCatalog;
use clap::Args;
use std::fmt;
use std::sync::Arc;

/// Arguments for the run command
#[derive(Args, Default)]
pub struct RunArgs {
    /// Platform to anonymize (directory under platforms/)
    #[arg(long)]
    pub platform: Option<String>,

    /// Database driver
    #[arg(long)]
    pub driver: Option<String>,

    /// Database host
    #[arg(long)]
    pub host: Option<String>,

    /// Database port
    #[arg(long)]
    pub port: Option<u16>,

    /// Database name
    #[arg(long)]
    pub database: Option<String>,

    /// Database user
    #[arg(long)]
    pub username: Option<String>,

    /// Database password
    #[arg(long)]
    pub password: Option<String>,

    /// Table name prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Connection charset
    #[arg(long)]
    pub charset: Option<String>,

    /// Generator locale, e.g. en_US or fr_FR
    #[arg(long)]
    pub locale: Option<String>,

    /// Groups to anonymize (comma-separated); all when omitted
    #[arg(long)]
    pub group: Option<String>,
}

impl fmt::Debug for RunArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunArgs")
            .field("platform", &self.platform)
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("prefix", &self.prefix)
            .field("charset", &self.charset)
            .field("locale", &self.locale)
            .field("group", &self.group)
            .finish()
    }
}

impl RunArgs {
    /// Applies the given flags on top of file and environment settings
    pub fn apply_overrides(&self, config: &mut MasqueradeConfig) {
        if let Some(platform) = &self.platform {
            config.platform = Some(platform.clone());
        }
        if let Some(locale) = &self.locale {
            config.locale = locale.clone();
        }
        if let Some(group) = &self.group {
            let groups = split_list(group);
            tracing::info!(groups = ?groups, "Overriding groups from CLI");
            config.groups = groups;
        }

        let db = &mut config.database;
        if let Some(driver) = &self.driver {
            db.driver = driver.clone();
        }
        if let Some(host) = &self.host {
            db.host = Some(host.clone());
        }
        if let Some(port) = self.port {
            db.port = port;
        }
        if let Some(database) = &self.database {
            db.database = Some(database.clone());
        }
        if let Some(username) = &self.username {
            db.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            db.password = Some(secret_string(password.clone()));
        }
        if let Some(prefix) = &self.prefix {
            db.prefix = prefix.clone();
        }
        if let Some(charset) = &self.charset {
            db.charset = charset.clone();
        }
    }

    /// Execute the run command
    ///
    /// Exit codes: 0 success, 1 some groups failed, 2 configuration error,
    /// 4 connection error.
    pub async fn execute(&self, loaded: Result<MasqueradeConfig>) -> anyhow::Result<i32> {
        tracing::info!("Starting run command");

        let mut config = match loaded {
            Ok(config) => config,
            Err(e) => {
                println!("❌ Failed to load configuration");
                println!("   Error: {e}");
                return Ok(2);
            }
        };
        self.apply_overrides(&mut config);

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            println!("❌ Configuration validation failed: {e}");
            return Ok(2);
        }

        println!("🎭 Masquerade v{}", env!("CARGO_PKG_VERSION"));
        println!();

        let platform = match ConfigResolver::from_config(&config).resolve(config.platform.as_deref()) {
            Ok(platform) => platform,
            Err(e) => {
                tracing::error!(error = %e, "Could not resolve platform configuration");
                println!("❌ {e}");
                return Ok(2);
            }
        };

        let (selected, _) = platform.select(&config.groups);
        let workers = worker_count(selected.len(), config.run.max_parallel_groups);

        let factory = match create_connection_factory(&config.database, workers) {
            Ok(factory) => factory,
            Err(e) => {
                tracing::error!(error = %e, "Could not create database connection");
                println!("❌ {e}");
                return Ok(if e.is_configuration() { 2 } else { 4 });
            }
        };

        println!("🔌 Testing database connection...");
        if let Err(e) = factory.test_connection().await {
            tracing::error!(error = %e, "Database connection failed");
            println!("❌ Database connection failed: {e}");
            return Ok(4);
        }
        println!("✅ Connected");
        println!();

        if selected.len() > 1 {
            println!("Starting max {workers} processes..");
        }
        let console = ConsoleSink::new(selected.len() <= 1);

        let ctx = RunContext::new(factory, ProviderCatalog::builtin(), RunOptions::from_config(&config));
        let orchestrator = GroupOrchestrator::new(ctx, Arc::new(console));
        let summary = orchestrator.run(&platform, &config.groups).await;

        print_summary(&summary);
        println!("Done anonymizing");

        Ok(if summary.is_successful() { 0 } else { 1 })
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("📊 Summary ({})", summary.platform);
    println!("   Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("   Tables processed: {}", summary.tables_processed());
    println!("   Tables skipped: {}", summary.tables_skipped());
    println!("   Rows updated: {}", summary.rows_updated());

    for name in &summary.unknown_groups {
        println!("   ⚠️  Unknown group: {name}");
    }

    for group in &summary.groups {
        for table in &group.tables {
            if !table.missing_columns.is_empty() {
                println!(
                    "   ⚠️  {}.{}: missing columns {}",
                    group.group,
                    table.table,
                    table.missing_columns.join(", ")
                );
            }
            if !table.omitted_columns.is_empty() {
                println!(
                    "   ⚠️  {}.{}: unresolved formatters for {}",
                    group.group,
                    table.table,
                    table.omitted_columns.join(", ")
                );
            }
        }
    }

    for group in summary.failed_groups() {
        println!(
            "   ❌ Group {} failed: {}",
            group.group,
            group.error.as_deref().unwrap_or_default()
        );
    }
    println!();
}
