//! Database abstraction traits
//!
//! The anonymization engine only needs a handful of capabilities from a
//! database: schema introspection, keyset reads of primary keys, keyed
//! updates, and switching foreign key enforcement. Each execution unit owns
//! one [`Connection`] for its whole lifetime.

use crate::domain::value::Value;
use crate::domain::Result;
use async_trait::async_trait;

/// Ordered column assignments for one `UPDATE`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSet {
    fields: Vec<(String, Value)>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an assignment; a later assignment to the same column wins
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: Value) -> Self {
        self.set(column, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(c, v)| (c.as_str(), v))
    }
}

/// Live schema introspection
#[async_trait]
pub trait SchemaInspector: Send + Sync {
    /// Whether `table` exists
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog query fails.
    async fn has_table(&self, table: &str) -> Result<bool>;

    /// Whether `table` has a column named `column`
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog query fails.
    async fn has_column(&self, table: &str, column: &str) -> Result<bool>;
}

/// Row access keyed by a primary key column
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Number of rows in `table`
    async fn count(&self, table: &str) -> Result<u64>;

    /// Up to `limit` primary key values greater than `after`, ascending
    ///
    /// `after = None` starts at the first row. An empty result means the
    /// table has been read to the end.
    async fn fetch_keys(
        &self,
        table: &str,
        key: &str,
        after: Option<&Value>,
        limit: usize,
    ) -> Result<Vec<Value>>;

    /// Applies `fields` to the row whose `key` equals `key_value`
    ///
    /// Returns the number of rows affected.
    async fn update(
        &self,
        table: &str,
        key: &str,
        key_value: &Value,
        fields: &UpdateSet,
    ) -> Result<u64>;

    /// Applies `fields` to every row of `table`
    async fn update_all(&self, table: &str, fields: &UpdateSet) -> Result<u64>;
}

/// One database session, owned by a single execution unit
#[async_trait]
pub trait Connection: SchemaInspector + RowStore {
    /// Enables or disables foreign key enforcement for this session
    ///
    /// # Errors
    ///
    /// Returns an error if the session setting cannot be changed
    /// (e.g. insufficient privileges).
    async fn set_foreign_key_checks(&self, enabled: bool) -> Result<()>;

    /// Human-readable driver name for logs
    fn driver_name(&self) -> &'static str;
}

/// Opens connections for execution units
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Opens a dedicated connection
    ///
    /// # Errors
    ///
    /// Returns `MasqueradeError::Connection` if the server cannot be reached.
    async fn connect(&self) -> Result<Box<dyn Connection>>;

    /// Checks that the server is reachable with the configured credentials
    async fn test_connection(&self) -> Result<()>;
}
