//! Validate config command implementation
//!
//! Loads the application configuration, resolves the platform configuration
//! and prints what a run would touch. No database connection is opened.

use crate::config::loader::split_list;
use crate::config::schema::MasqueradeConfig;
use crate::config::ConfigResolver;
use crate::domain::table::PlatformConfig;
use crate::domain::Result;
use crate::generator::{FormatterRegistry, Locale, ProviderCatalog};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {
    /// Platform to resolve
    #[arg(long)]
    pub platform: Option<String>,

    /// Groups to show (comma-separated)
    #[arg(long)]
    pub group: Option<String>,
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(
        &self,
        config_path: &str,
        loaded: Result<MasqueradeConfig>,
    ) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let mut config = match loaded {
            Ok(c) => {
                println!("✅ Configuration loaded");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };
        if let Some(platform) = &self.platform {
            config.platform = Some(platform.clone());
        }
        if let Some(group) = &self.group {
            config.groups = split_list(group);
        }

        let platform = match ConfigResolver::from_config(&config).resolve(config.platform.as_deref())
        {
            Ok(p) => {
                println!("✅ Platform configuration resolved");
                p
            }
            Err(e) => {
                println!("❌ Failed to resolve platform configuration");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!();
        println!("Configuration Summary:");
        println!(
            "  Platform: {} ({} groups, {} tables)",
            platform.platform,
            platform.groups.len(),
            platform.table_count()
        );
        println!("  Locale: {}", Locale::resolve(&config.locale));
        println!(
            "  Database: {}://{}:{}/{}",
            config.database.driver,
            config.database.host.as_deref().unwrap_or("-"),
            config.database.port,
            config.database.database.as_deref().unwrap_or("-")
        );
        println!("  Table Prefix: {:?}", config.database.prefix);
        println!("  Batch Size: {}", config.run.batch_size);
        println!("  Foreign Key Checks: {}", config.run.foreign_key_checks);
        println!();

        let (selected, unknown) = platform.select(&config.groups);
        for name in &unknown {
            println!("⚠️  Group {name} is not configured");
        }
        for group in &selected {
            println!("📦 {} ({} tables)", group.name, group.tables.len());
            for table in &group.tables {
                println!(
                    "   {} [pk {}]: {} columns",
                    table.name,
                    table.primary_key,
                    table.columns.len()
                );
            }
        }

        let unknown_formatters = unknown_formatters(&platform);
        if !unknown_formatters.is_empty() {
            println!();
            for (location, name) in &unknown_formatters {
                println!("⚠️  {location}: formatter '{name}' is not known and will be skipped");
            }
        }
        println!();

        Ok(0)
    }
}

/// Columns whose formatter no known provider supplies
///
/// Columns naming an unknown provider are reported too; a run fails on them.
fn unknown_formatters(platform: &PlatformConfig) -> Vec<(String, String)> {
    let catalog = ProviderCatalog::builtin();
    let mut base = FormatterRegistry::default();
    crate::generator::builtin::register_builtins(&mut base);

    let mut found = Vec::new();
    for group in &platform.groups {
        for table in &group.tables {
            for column in &table.columns {
                let Some(formatter) = &column.formatter else {
                    continue;
                };
                let location = format!("{}.{}.{}", group.name, table.name, column.name);
                let known = match column.provider.as_deref() {
                    None => base.contains(formatter.name()),
                    Some(id) => match catalog.get(id) {
                        Ok(provider) => {
                            let mut registry = base.clone();
                            provider.register(&mut registry);
                            registry.contains(formatter.name())
                        }
                        Err(_) => {
                            found.push((location, format!("{}::{}", id, formatter.name())));
                            continue;
                        }
                    },
                };
                if !known && formatter.name() != "fixed" {
                    found.push((location, formatter.name().to_string()));
                }
            }
        }
    }
    found
}
