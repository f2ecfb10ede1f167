//! Schema drift detection
//!
//! Configured tables and columns are checked against the live schema once
//! per table, before any row is read. Drift is never fatal.

use crate::adapters::database::traits::SchemaInspector;
use crate::domain::table::TableSpec;
use crate::domain::Result;

/// Outcome of checking one table
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaCheck {
    /// The table does not exist; nothing is done for it
    Skip,
    /// The table exists; `table` holds only the columns that exist
    Ready {
        table: TableSpec,
        missing: Vec<String>,
        /// Columns dropped because they name the primary key
        protected: Vec<String>,
    },
}

/// Validates table declarations against a live schema
pub struct SchemaValidator<'a, I: SchemaInspector + ?Sized> {
    inspector: &'a I,
}

impl<'a, I: SchemaInspector + ?Sized> SchemaValidator<'a, I> {
    pub fn new(inspector: &'a I) -> Self {
        Self { inspector }
    }

    /// Checks `table` and builds its working column set
    ///
    /// # Errors
    ///
    /// Returns an error only if the catalog cannot be queried.
    pub async fn check(&self, table: &TableSpec) -> Result<SchemaCheck> {
        if !self.inspector.has_table(&table.name).await? {
            tracing::warn!(table = %table.name, "Table not found, skipping");
            return Ok(SchemaCheck::Skip);
        }

        let mut missing = Vec::new();
        let mut protected = Vec::new();
        for column in &table.columns {
            if column.name == table.primary_key {
                tracing::warn!(
                    table = %table.name,
                    column = %column.name,
                    "Primary key column is never rewritten, ignoring"
                );
                protected.push(column.name.clone());
            } else if !self.inspector.has_column(&table.name, &column.name).await? {
                tracing::warn!(
                    table = %table.name,
                    column = %column.name,
                    "Column not found, skipping"
                );
                missing.push(column.name.clone());
            }
        }

        let dropped: Vec<String> = missing.iter().chain(&protected).cloned().collect();
        Ok(SchemaCheck::Ready {
            table: table.without_columns(&dropped),
            missing,
            protected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::{ColumnSpec, FormatterSpec};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct Catalog(HashMap<&'static str, Vec<&'static str>>);

    #[async_trait]
    impl SchemaInspector for Catalog {
        async fn has_table(&self, table: &str) -> Result<bool> {
            Ok(self.0.contains_key(table))
        }

        async fn has_column(&self, table: &str, column: &str) -> Result<bool> {
            Ok(self.0.get(table).is_some_and(|cols| cols.iter().any(|c| *c == column)))
        }
    }

    fn catalog() -> Catalog {
        Catalog(HashMap::from([(
            "customer_entity",
            vec!["entity_id", "email", "firstname"],
        )]))
    }

    fn spec(name: &str) -> TableSpec {
        TableSpec::new(name)
            .with_column(ColumnSpec::new("email").with_formatter(FormatterSpec::call("safeEmail", vec![])))
            .with_column(ColumnSpec::new("middlename").with_formatter(FormatterSpec::call("firstName", vec![])))
            .with_column(ColumnSpec::new("firstname").with_formatter(FormatterSpec::call("firstName", vec![])))
    }

    #[tokio::test]
    async fn test_missing_table_is_skipped() {
        let catalog = catalog();
        let check = SchemaValidator::new(&catalog).check(&spec("gone")).await.unwrap();
        assert_eq!(check, SchemaCheck::Skip);
    }

    #[tokio::test]
    async fn test_missing_columns_are_removed() {
        let catalog = catalog();
        let check = SchemaValidator::new(&catalog)
            .check(&spec("customer_entity"))
            .await
            .unwrap();

        let SchemaCheck::Ready { table, missing, protected } = check else {
            panic!("expected table to be ready");
        };
        assert_eq!(missing, vec!["middlename".to_string()]);
        assert!(protected.is_empty());
        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["email", "firstname"]);
    }

    #[tokio::test]
    async fn test_primary_key_column_is_protected() {
        let catalog = catalog();
        let table = TableSpec::new("customer_entity")
            .with_column(ColumnSpec::new("entity_id").with_formatter(FormatterSpec::call("randomNumber", vec![])));
        let check = SchemaValidator::new(&catalog).check(&table).await.unwrap();

        let SchemaCheck::Ready { table, protected, .. } = check else {
            panic!("expected table to be ready");
        };
        assert_eq!(protected, vec!["entity_id".to_string()]);
        assert!(table.columns.is_empty());
    }
}
