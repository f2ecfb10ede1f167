//! PostgreSQL adapter implementing the database traits
//!
//! Wraps one pooled connection. Table names are prefixed with the configured
//! table prefix and quoted; `schema.table` names are split and quoted per part.
//!
//! Updates are prepared once with plain placeholders. When a parameter type
//! has no native encoder (`numeric`, `inet`, arrays, `citext`, ...), the
//! statement is prepared again with that placeholder cast from text.

use crate::adapters::database::traits::{Connection, RowStore, SchemaInspector, UpdateSet};
use crate::adapters::postgresql::params::{
    has_native_encoder, key_from_row, to_sql_param, SqlParam,
};
use crate::domain::value::Value;
use crate::domain::{MasqueradeError, Result};
use async_trait::async_trait;
use tokio_postgres::types::{ToSql, Type};

/// PostgreSQL implementation of [`Connection`]
pub struct PostgreSQLConnection {
    client: deadpool_postgres::Object,
    prefix: String,
}

impl PostgreSQLConnection {
    /// Wraps a checked-out pool object
    pub fn new(client: deadpool_postgres::Object, prefix: String) -> Self {
        Self { client, prefix }
    }

    /// Splits `table` into optional schema and prefixed table name
    fn qualify<'a>(&self, table: &'a str) -> (Option<&'a str>, String) {
        match table.split_once('.') {
            Some((schema, name)) => (Some(schema), format!("{}{}", self.prefix, name)),
            None => (None, format!("{}{}", self.prefix, table)),
        }
    }

    /// Quoted, prefixed table reference for use in SQL text
    fn table_ref(&self, table: &str) -> String {
        match self.qualify(table) {
            (Some(schema), name) => format!("{}.{}", quote_ident(schema), quote_ident(&name)),
            (None, name) => quote_ident(&name),
        }
    }

    /// Prepares the statement `sql` renders and binds `values` following its
    /// parameter types
    ///
    /// `sql` receives one optional cast per parameter position.
    async fn execute_with<F>(&self, sql: F, values: &[&Value]) -> Result<u64>
    where
        F: Fn(&[Option<String>]) -> String,
    {
        let plain = sql(&[]);
        let mut statement = self
            .client
            .prepare_cached(&plain)
            .await
            .map_err(|e| db_error("prepare", e))?;

        let casts = text_casts(statement.params(), values);
        if casts.iter().any(Option::is_some) {
            let cast_sql = sql(&casts);
            tracing::debug!(sql = %cast_sql, "Binding through text casts");
            statement = self
                .client
                .prepare_cached(&cast_sql)
                .await
                .map_err(|e| db_error("prepare", e))?;
        }

        let params = statement
            .params()
            .iter()
            .zip(values)
            .map(|(ty, value)| to_sql_param(value, ty))
            .collect::<Result<Vec<SqlParam>>>()?;
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        self.client
            .execute(&statement, &refs)
            .await
            .map_err(|e| db_error("execute", e))
    }
}

/// Type to cast a text parameter to, for each non-NULL value whose type
/// cannot be encoded natively
fn text_casts(types: &[Type], values: &[&Value]) -> Vec<Option<String>> {
    types
        .iter()
        .zip(values)
        .map(|(ty, value)| {
            (!value.is_null() && !has_native_encoder(ty)).then(|| type_ref(ty))
        })
        .collect()
}

/// Quoted, schema-qualified type name; array types keep their `_elem` name
fn type_ref(ty: &Type) -> String {
    match ty.schema() {
        "pg_catalog" | "" => quote_ident(ty.name()),
        schema => format!("{}.{}", quote_ident(schema), quote_ident(ty.name())),
    }
}

/// `$n`, or `$n::text::<type>` when position `n` is cast
fn placeholder(n: usize, casts: &[Option<String>]) -> String {
    match casts.get(n - 1) {
        Some(Some(ty)) => format!("${n}::text::{ty}"),
        _ => format!("${n}"),
    }
}

/// Quotes a PostgreSQL identifier
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn db_error(action: &str, e: tokio_postgres::Error) -> MasqueradeError {
    MasqueradeError::Database(format!("Failed to {action} statement: {e}"))
}

/// `"a" = $1, "b" = $2, ...`
fn assignments(fields: &UpdateSet, casts: &[Option<String>]) -> String {
    fields
        .columns()
        .enumerate()
        .map(|(i, column)| format!("{} = {}", quote_ident(column), placeholder(i + 1, casts)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl SchemaInspector for PostgreSQLConnection {
    async fn has_table(&self, table: &str) -> Result<bool> {
        let (schema, name) = self.qualify(table);
        let row = self
            .client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
                 WHERE table_schema = COALESCE($1::text, current_schema()) AND table_name = $2::text)",
                &[&schema, &name],
            )
            .await
            .map_err(|e| db_error("inspect table", e))?;
        Ok(row.get(0))
    }

    async fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        let (schema, name) = self.qualify(table);
        let row = self
            .client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM information_schema.columns \
                 WHERE table_schema = COALESCE($1::text, current_schema()) \
                 AND table_name = $2::text AND column_name = $3::text)",
                &[&schema, &name, &column],
            )
            .await
            .map_err(|e| db_error("inspect column", e))?;
        Ok(row.get(0))
    }
}

#[async_trait]
impl RowStore for PostgreSQLConnection {
    async fn count(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table_ref(table));
        let row = self
            .client
            .query_one(sql.as_str(), &[])
            .await
            .map_err(|e| db_error("count", e))?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }

    async fn fetch_keys(
        &self,
        table: &str,
        key: &str,
        after: Option<&Value>,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let table_ref = self.table_ref(table);
        let key_ref = quote_ident(key);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let sql = match after {
            Some(_) => format!(
                "SELECT {key_ref} FROM {table_ref} WHERE {key_ref} > $1 ORDER BY {key_ref} LIMIT $2"
            ),
            None => format!("SELECT {key_ref} FROM {table_ref} ORDER BY {key_ref} LIMIT $1"),
        };

        let statement = self
            .client
            .prepare_cached(&sql)
            .await
            .map_err(|e| db_error("prepare", e))?;

        let rows = match after {
            Some(last) => {
                let last = to_sql_param(last, &statement.params()[0])?;
                self.client
                    .query(&statement, &[last.as_ref() as &(dyn ToSql + Sync), &limit])
                    .await
            }
            None => self.client.query(&statement, &[&limit]).await,
        }
        .map_err(|e| db_error("fetch keys", e))?;

        rows.iter().map(|row| key_from_row(row, 0)).collect()
    }

    async fn update(
        &self,
        table: &str,
        key: &str,
        key_value: &Value,
        fields: &UpdateSet,
    ) -> Result<u64> {
        if fields.is_empty() {
            return Ok(0);
        }
        let table_ref = self.table_ref(table);
        let key_ref = quote_ident(key);
        let sql = |casts: &[Option<String>]| {
            format!(
                "UPDATE {table_ref} SET {} WHERE {key_ref} = {}",
                assignments(fields, casts),
                placeholder(fields.len() + 1, casts)
            )
        };
        let mut values: Vec<&Value> = fields.iter().map(|(_, v)| v).collect();
        values.push(key_value);
        self.execute_with(sql, &values).await
    }

    async fn update_all(&self, table: &str, fields: &UpdateSet) -> Result<u64> {
        if fields.is_empty() {
            return Ok(0);
        }
        let table_ref = self.table_ref(table);
        let sql =
            |casts: &[Option<String>]| format!("UPDATE {table_ref} SET {}", assignments(fields, casts));
        let values: Vec<&Value> = fields.iter().map(|(_, v)| v).collect();
        self.execute_with(sql, &values).await
    }
}

#[async_trait]
impl Connection for PostgreSQLConnection {
    async fn set_foreign_key_checks(&self, enabled: bool) -> Result<()> {
        let sql = if enabled {
            "SET session_replication_role = DEFAULT"
        } else {
            "SET session_replication_role = replica"
        };
        self.client.batch_execute(sql).await.map_err(|e| {
            MasqueradeError::Database(format!(
                "Failed to {} foreign key checks: {e}",
                if enabled { "enable" } else { "disable" }
            ))
        })?;
        tracing::debug!(enabled, "Foreign key checks changed");
        Ok(())
    }

    fn driver_name(&self) -> &'static str {
        "postgresql"
    }
}
