//! Resolved platform model
//!
//! [`PlatformConfig`] is the merged, immutable result of loading a platform's
//! default and override sources. Groups and tables keep configuration order,
//! which is also the order they are processed in.

use crate::domain::value::Value;

/// Primary key column used when a table does not declare `pk`
pub const DEFAULT_PRIMARY_KEY: &str = "entity_id";

/// How a column obtains its new value
#[derive(Debug, Clone, PartialEq)]
pub enum FormatterSpec {
    /// The same literal for every row; no generator is created
    Fixed(Value),
    /// A named generator method called with positional arguments
    Call { name: String, args: Vec<Value> },
}

impl FormatterSpec {
    pub fn call(name: impl Into<String>, args: Vec<Value>) -> Self {
        FormatterSpec::Call {
            name: name.into(),
            args,
        }
    }

    /// Method name, or `fixed` for literals
    pub fn name(&self) -> &str {
        match self {
            FormatterSpec::Fixed(_) => "fixed",
            FormatterSpec::Call { name, .. } => name,
        }
    }
}

/// Value-shaping modifiers
///
/// Part of the generator cache key, so two columns with the same locale,
/// provider and modifiers share one handle (and one `unique` history).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub unique: bool,
    pub optional: bool,
    pub valid: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !(self.unique || self.optional || self.valid)
    }
}

/// One configured column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    /// `None` means the column is configured but never updated
    pub formatter: Option<FormatterSpec>,
    /// Catalog identifier of a custom generator provider
    pub provider: Option<String>,
    pub modifiers: Modifiers,
    /// Set the whole column to NULL once before the first batch
    pub null_column_before_run: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formatter: None,
            provider: None,
            modifiers: Modifiers::none(),
            null_column_before_run: false,
        }
    }

    pub fn with_formatter(mut self, formatter: FormatterSpec) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn null_before_run(mut self) -> Self {
        self.null_column_before_run = true;
        self
    }
}

/// One configured table
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: String,
    pub primary_key: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            columns: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, pk: impl Into<String>) -> Self {
        self.primary_key = pk.into();
        self
    }

    pub fn with_column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Working copy without the given columns
    pub fn without_columns(&self, dropped: &[String]) -> TableSpec {
        TableSpec {
            name: self.name.clone(),
            primary_key: self.primary_key.clone(),
            columns: self
                .columns
                .iter()
                .filter(|c| !dropped.contains(&c.name))
                .cloned()
                .collect(),
        }
    }

    /// Columns that must be nulled before the first batch
    pub fn nulled_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.null_column_before_run)
    }
}

/// A named set of tables processed together by one execution unit
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    pub name: String,
    pub tables: Vec<TableSpec>,
}

impl GroupSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
        }
    }

    /// Insert or wholesale replace a table, keeping the original position
    pub fn upsert_table(&mut self, table: TableSpec) {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// The merged configuration of one platform
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformConfig {
    pub platform: String,
    pub groups: Vec<GroupSpec>,
}

impl PlatformConfig {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            groups: Vec::new(),
        }
    }

    pub fn group(&self, name: &str) -> Option<&GroupSpec> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn group_mut_or_insert(&mut self, name: &str) -> &mut GroupSpec {
        let idx = match self.groups.iter().position(|g| g.name == name) {
            Some(idx) => idx,
            None => {
                self.groups.push(GroupSpec::new(name));
                self.groups.len() - 1
            }
        };
        &mut self.groups[idx]
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    /// Tables across all groups
    pub fn table_count(&self) -> usize {
        self.groups.iter().map(|g| g.tables.len()).sum()
    }

    /// Groups matching `filter` in configuration order, plus filter entries
    /// that name no configured group. An empty filter selects everything.
    pub fn select(&self, filter: &[String]) -> (Vec<&GroupSpec>, Vec<String>) {
        if filter.is_empty() {
            return (self.groups.iter().collect(), Vec::new());
        }

        let selected = self
            .groups
            .iter()
            .filter(|g| filter.iter().any(|f| f == &g.name))
            .collect();
        let unknown = filter
            .iter()
            .filter(|f| self.group(f).is_none())
            .cloned()
            .collect();
        (selected, unknown)
    }
}
