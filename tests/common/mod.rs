//! Shared test fixtures: an in-memory database behind the connection traits
//! and a progress sink that records events.

#![allow(dead_code)]

use async_trait::async_trait;
use masquerade::adapters::database::{
    Connection, ConnectionFactory, RowStore, SchemaInspector, UpdateSet,
};
use masquerade::core::progress::{ProgressEvent, ProgressSink};
use masquerade::domain::{MasqueradeError, Result, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One statement the engine issued
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    FetchKeys {
        table: String,
        after: Option<i64>,
    },
    Update {
        table: String,
        key: i64,
        columns: Vec<String>,
    },
    UpdateAll {
        table: String,
        columns: Vec<String>,
    },
    ForeignKeys(bool),
}

#[derive(Debug, Clone)]
pub struct MemoryTable {
    pub primary_key: String,
    pub columns: Vec<String>,
    pub rows: BTreeMap<i64, HashMap<String, Value>>,
}

impl MemoryTable {
    pub fn new(primary_key: &str, columns: &[&str]) -> Self {
        let mut all = vec![primary_key.to_string()];
        all.extend(columns.iter().map(|c| c.to_string()));
        Self {
            primary_key: primary_key.to_string(),
            columns: all,
            rows: BTreeMap::new(),
        }
    }

    pub fn with_row(mut self, key: i64, values: &[(&str, Value)]) -> Self {
        let mut row: HashMap<String, Value> = values
            .iter()
            .map(|(c, v)| (c.to_string(), v.clone()))
            .collect();
        row.insert(self.primary_key.clone(), Value::Int(key));
        self.rows.insert(key, row);
        self
    }
}

/// Tables plus a log of everything done to them
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: Mutex<BTreeMap<String, MemoryTable>>,
    ops: Mutex<Vec<Op>>,
    failing_tables: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    connections: AtomicUsize,
}

impl MemoryDatabase {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_table(&self, name: &str, table: MemoryTable) {
        self.tables.lock().unwrap().insert(name.to_string(), table);
    }

    /// Every update of `name` fails
    pub fn fail_updates_of(&self, name: &str) {
        self.failing_tables.lock().unwrap().push(name.to_string());
    }

    pub fn table(&self, name: &str) -> MemoryTable {
        self.tables.lock().unwrap()[name].clone()
    }

    pub fn column(&self, table: &str, column: &str) -> Vec<Value> {
        self.table(table)
            .rows
            .values()
            .map(|row| row.get(column).cloned().unwrap_or_default())
            .collect()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    pub fn ops_on(&self, table: &str) -> Vec<Op> {
        self.ops()
            .into_iter()
            .filter(|op| match op {
                Op::FetchKeys { table: t, .. }
                | Op::Update { table: t, .. }
                | Op::UpdateAll { table: t, .. } => t == table,
                Op::ForeignKeys(_) => false,
            })
            .collect()
    }

    /// Highest number of simultaneously open connections
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn connections_opened(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    fn record(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }

    fn apply(&self, table: &str, key: Option<i64>, fields: &UpdateSet) -> Result<u64> {
        if self.failing_tables.lock().unwrap().iter().any(|t| t == table) {
            return Err(MasqueradeError::Database(format!(
                "update of {table} rejected"
            )));
        }
        let mut tables = self.tables.lock().unwrap();
        let data = tables
            .get_mut(table)
            .ok_or_else(|| MasqueradeError::Database(format!("relation {table} does not exist")))?;

        let mut affected = 0;
        for (row_key, row) in data.rows.iter_mut() {
            if key.is_some_and(|k| k != *row_key) {
                continue;
            }
            for (column, value) in fields.iter() {
                row.insert(column.to_string(), value.clone());
            }
            affected += 1;
        }
        Ok(affected)
    }
}

pub struct MemoryConnection {
    db: Arc<MemoryDatabase>,
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.db.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SchemaInspector for MemoryConnection {
    async fn has_table(&self, table: &str) -> Result<bool> {
        Ok(self.db.tables.lock().unwrap().contains_key(table))
    }

    async fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self
            .db
            .tables
            .lock()
            .unwrap()
            .get(table)
            .is_some_and(|t| t.columns.iter().any(|c| c == column)))
    }
}

#[async_trait]
impl RowStore for MemoryConnection {
    async fn count(&self, table: &str) -> Result<u64> {
        Ok(self.db.table(table).rows.len() as u64)
    }

    async fn fetch_keys(
        &self,
        table: &str,
        key: &str,
        after: Option<&Value>,
        limit: usize,
    ) -> Result<Vec<Value>> {
        // Let sibling workers run between batches
        tokio::task::yield_now().await;

        let after = after.and_then(Value::as_i64);
        self.db.record(Op::FetchKeys {
            table: table.to_string(),
            after,
        });

        let data = self.db.table(table);
        assert_eq!(data.primary_key, key);
        Ok(data
            .rows
            .keys()
            .filter(|k| after.map_or(true, |a| **k > a))
            .take(limit)
            .map(|k| Value::Int(*k))
            .collect())
    }

    async fn update(
        &self,
        table: &str,
        _key: &str,
        key_value: &Value,
        fields: &UpdateSet,
    ) -> Result<u64> {
        let key = key_value.as_i64().unwrap();
        self.db.record(Op::Update {
            table: table.to_string(),
            key,
            columns: fields.columns().map(str::to_string).collect(),
        });
        self.db.apply(table, Some(key), fields)
    }

    async fn update_all(&self, table: &str, fields: &UpdateSet) -> Result<u64> {
        self.db.record(Op::UpdateAll {
            table: table.to_string(),
            columns: fields.columns().map(str::to_string).collect(),
        });
        self.db.apply(table, None, fields)
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn set_foreign_key_checks(&self, enabled: bool) -> Result<()> {
        self.db.record(Op::ForeignKeys(enabled));
        Ok(())
    }

    fn driver_name(&self) -> &'static str {
        "memory"
    }
}

pub struct MemoryFactory {
    db: Arc<MemoryDatabase>,
    reachable: bool,
}

impl MemoryFactory {
    pub fn new(db: Arc<MemoryDatabase>) -> Arc<Self> {
        Arc::new(Self {
            db,
            reachable: true,
        })
    }

    pub fn unreachable(db: Arc<MemoryDatabase>) -> Arc<Self> {
        Arc::new(Self {
            db,
            reachable: false,
        })
    }
}

#[async_trait]
impl ConnectionFactory for MemoryFactory {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        if !self.reachable {
            return Err(MasqueradeError::Connection("connection refused".to_string()));
        }
        tokio::task::yield_now().await;
        let active = self.db.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.db.max_active.fetch_max(active, Ordering::SeqCst);
        self.db.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection {
            db: Arc::clone(&self.db),
        }))
    }

    async fn test_connection(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(MasqueradeError::Connection("connection refused".to_string()))
        }
    }
}

/// Collects every progress event
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Warning { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// `n` customers with duplicate emails and distinct names
pub fn customers(n: i64) -> MemoryTable {
    (1..=n).fold(
        MemoryTable::new("id", &["email", "firstname", "lastname", "nickname"]),
        |table, id| {
            table.with_row(
                id,
                &[
                    ("email", Value::from("same@example.com")),
                    ("firstname", Value::from(format!("First{id}"))),
                    ("lastname", Value::from(format!("Last{id}"))),
                    ("nickname", Value::from(format!("nick{id}"))),
                ],
            )
        },
    )
}
