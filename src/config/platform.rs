//! Platform configuration resolution
//!
//! A platform (e.g. `magento2`) is described by a directory of TOML files,
//! one or more groups per file:
//!
//! ```toml
//! [customer.customer_entity]
//! pk = "entity_id"
//!
//! [customer.customer_entity.columns.email]
//! formatter = "safeEmail"
//! unique = true
//! nullColumnBeforeRun = true
//!
//! [customer.customer_entity.columns.dob]
//! formatter = { name = "date", args = ["Y-m-d"] }
//! ```
//!
//! [`ConfigResolver`] reads the default directory `<platforms_dir>/<platform>`
//! and, when present, the local override directory `<override_dir>/<platform>`,
//! and merges them into one [`PlatformConfig`]. Files are read in lexical
//! order. Within a group, a table defined later replaces an earlier table of
//! the same name wholesale; tables it does not mention are kept.
//!
//! Overrides merge per table, not per group: an override file that names a
//! group does not replace that group, it only replaces (or adds) the tables
//! it lists. Default tables of the group keep running unless overridden.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::MasqueradeConfig;
use crate::domain::context::ResultExt;
use crate::domain::errors::MasqueradeError;
use crate::domain::result::Result;
use crate::domain::table::{
    ColumnSpec, FormatterSpec, Modifiers, PlatformConfig, TableSpec, DEFAULT_PRIMARY_KEY,
};
use crate::domain::value::Value;

/// Builds the merged platform model from default and override directories
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    platforms_dir: PathBuf,
    override_dir: PathBuf,
}

impl ConfigResolver {
    pub fn new(platforms_dir: impl Into<PathBuf>, override_dir: impl Into<PathBuf>) -> Self {
        Self {
            platforms_dir: platforms_dir.into(),
            override_dir: override_dir.into(),
        }
    }

    pub fn from_config(config: &MasqueradeConfig) -> Self {
        Self::new(&config.run.platforms_dir, &config.run.override_dir)
    }

    /// Resolves the configuration of `platform`
    ///
    /// # Errors
    ///
    /// Returns `MasqueradeError::Configuration` if no platform is given, the
    /// default directory is missing or holds no TOML files, or any file is
    /// malformed.
    pub fn resolve(&self, platform: Option<&str>) -> Result<PlatformConfig> {
        let platform = platform.map(str::trim).filter(|p| !p.is_empty()).ok_or_else(|| {
            MasqueradeError::Configuration(
                "No platform set, use option --platform or set it in masquerade.toml".to_string(),
            )
        })?;

        let default_dir = self.platforms_dir.join(platform);
        if !default_dir.is_dir() {
            return Err(MasqueradeError::Configuration(format!(
                "Default configuration directory not found: {}",
                default_dir.display()
            )));
        }

        let mut config = PlatformConfig::new(platform);
        let loaded = load_source(&default_dir, &mut config)?;
        if loaded == 0 {
            return Err(MasqueradeError::Configuration(format!(
                "Default configuration directory is empty: {}",
                default_dir.display()
            )));
        }
        tracing::debug!(
            platform = %platform,
            files = loaded,
            dir = %default_dir.display(),
            "Loaded default platform configuration"
        );

        let override_dir = self.override_dir.join(platform);
        if override_dir.is_dir() {
            let mut overrides = PlatformConfig::new(platform);
            let files = load_source(&override_dir, &mut overrides)?;
            tracing::info!(
                platform = %platform,
                files,
                dir = %override_dir.display(),
                "Applying local configuration overrides"
            );
            merge(&mut config, overrides);
        }

        Ok(config)
    }
}

/// Folds `overrides` into `base`
///
/// Override tables replace base tables with the same name inside the same
/// group; groups only present in `overrides` are appended.
///
/// A group is never replaced as a whole. Its base tables that `overrides`
/// does not name stay in place, columns included.
pub fn merge(base: &mut PlatformConfig, overrides: PlatformConfig) {
    for group in overrides.groups {
        let target = base.group_mut_or_insert(&group.name);
        for table in group.tables {
            target.upsert_table(table);
        }
    }
}

/// Reads every `*.toml` file of `dir` (lexical order) into `into`
///
/// Returns the number of files read.
fn load_source(dir: &Path, into: &mut PlatformConfig) -> Result<usize> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read configuration directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    files.sort();

    for file in &files {
        let text = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        parse_groups(&text, into).map_err(|e| match e {
            MasqueradeError::Configuration(msg) => {
                MasqueradeError::Configuration(format!("{}: {msg}", file.display()))
            }
            other => other,
        })?;
    }

    Ok(files.len())
}

/// Parses one platform file and merges its groups into `into`
///
/// # Errors
///
/// Returns `MasqueradeError::Configuration` for TOML syntax errors or
/// definitions of the wrong shape.
pub fn parse_groups(text: &str, into: &mut PlatformConfig) -> Result<()> {
    let document: toml::Table = toml::from_str(text)?;

    for (group_name, group_value) in document {
        let tables = group_value.as_table().ok_or_else(|| {
            MasqueradeError::Configuration(format!("group '{group_name}' must be a table"))
        })?;

        let group = into.group_mut_or_insert(&group_name);
        for (table_name, table_value) in tables {
            group.upsert_table(parse_table(table_name, table_value)?);
        }
    }

    Ok(())
}

fn parse_table(name: &str, value: &toml::Value) -> Result<TableSpec> {
    let def = value.as_table().ok_or_else(|| {
        MasqueradeError::Configuration(format!("table '{name}' must be a table"))
    })?;

    let primary_key = match def.get("pk").or_else(|| def.get("primary_key")) {
        Some(toml::Value::String(pk)) if !pk.trim().is_empty() => pk.clone(),
        Some(_) => {
            return Err(MasqueradeError::Configuration(format!(
                "table '{name}': pk must be a non-empty string"
            )))
        }
        None => DEFAULT_PRIMARY_KEY.to_string(),
    };

    let mut table = TableSpec::new(name).with_primary_key(primary_key);

    if let Some(columns) = def.get("columns") {
        let columns = columns.as_table().ok_or_else(|| {
            MasqueradeError::Configuration(format!("table '{name}': columns must be a table"))
        })?;
        for (column_name, column_value) in columns {
            let column = parse_column(column_name, column_value)
                .with_context(|| format!("table '{name}'"))?;
            table.columns.push(column);
        }
    }

    for key in def.keys() {
        if !matches!(key.as_str(), "pk" | "primary_key" | "columns") {
            tracing::warn!(table = %name, key = %key, "Ignoring unknown table setting");
        }
    }

    Ok(table)
}

fn parse_column(name: &str, value: &toml::Value) -> Result<ColumnSpec> {
    // `email = "safeEmail"` is shorthand for a formatter without flags
    if let toml::Value::String(method) = value {
        return Ok(ColumnSpec::new(name).with_formatter(parse_formatter(value).map_err(
            |_| MasqueradeError::Configuration(format!("column '{name}': bad formatter '{method}'")),
        )?));
    }

    let def = value.as_table().ok_or_else(|| {
        MasqueradeError::Configuration(format!("column '{name}' must be a table or a string"))
    })?;

    let mut column = ColumnSpec::new(name);
    let mut modifiers = Modifiers::none();

    for (key, setting) in def {
        match key.as_str() {
            "formatter" => {
                column.formatter = Some(
                    parse_formatter(setting).with_context(|| format!("column '{name}'"))?,
                )
            }
            "provider" => {
                let provider = setting.as_str().ok_or_else(|| {
                    MasqueradeError::Configuration(format!(
                        "column '{name}': provider must be a string"
                    ))
                })?;
                column.provider = Some(provider.to_string());
            }
            "unique" => modifiers.unique = flag(name, key, setting)?,
            "optional" => modifiers.optional = flag(name, key, setting)?,
            "valid" => modifiers.valid = flag(name, key, setting)?,
            "nullColumnBeforeRun" | "null_column_before_run" => {
                column.null_column_before_run = flag(name, key, setting)?
            }
            other => {
                tracing::warn!(column = %name, key = %other, "Ignoring unknown column setting");
            }
        }
    }

    column.modifiers = modifiers;
    Ok(column)
}

fn flag(column: &str, key: &str, value: &toml::Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| {
        MasqueradeError::Configuration(format!("column '{column}': {key} must be true or false"))
    })
}

/// Parses the `formatter` setting of a column
///
/// Accepted forms:
/// - `"safeEmail"`: method without arguments
/// - `{ name = "numberBetween", args = [1, 10] }`: method with arguments
/// - `{ name = "numberBetween", min = 1, max = 10 }`: remaining keys are
///   positional arguments in declaration order
/// - `{ name = "fixed", value = 0 }`: literal (`value`, else the first
///   argument, else NULL)
/// - any other scalar: literal
pub fn parse_formatter(value: &toml::Value) -> Result<FormatterSpec> {
    match value {
        toml::Value::String(name) if name == "fixed" => Ok(FormatterSpec::Fixed(Value::Null)),
        toml::Value::String(name) if name.trim().is_empty() => Err(
            MasqueradeError::Configuration("formatter name cannot be empty".to_string()),
        ),
        toml::Value::String(name) => Ok(FormatterSpec::call(name.trim(), Vec::new())),
        toml::Value::Table(def) => {
            let name = def
                .get("name")
                .and_then(toml::Value::as_str)
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| {
                    MasqueradeError::Configuration("formatter requires a name".to_string())
                })?;

            let args = match def.get("args") {
                Some(toml::Value::Array(items)) => items
                    .iter()
                    .map(Value::try_from)
                    .collect::<Result<Vec<_>>>()?,
                Some(single) => vec![Value::try_from(single)?],
                None => def
                    .iter()
                    .filter(|(k, _)| k.as_str() != "name" && k.as_str() != "value")
                    .map(|(_, v)| Value::try_from(v))
                    .collect::<Result<Vec<_>>>()?,
            };

            if name == "fixed" {
                let literal = match def.get("value") {
                    Some(v) => Value::try_from(v)?,
                    None => args.into_iter().next().unwrap_or(Value::Null),
                };
                return Ok(FormatterSpec::Fixed(literal));
            }

            Ok(FormatterSpec::call(name, args))
        }
        toml::Value::Array(_) => Err(MasqueradeError::Configuration(
            "formatter cannot be an array".to_string(),
        )),
        scalar => Ok(FormatterSpec::Fixed(Value::try_from(scalar)?)),
    }
}
