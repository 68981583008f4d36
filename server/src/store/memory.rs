use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde_json::{Map, Value};

use super::{PollStore, StoreError, StoreFuture};

/// Every call the store received, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Select {
        table: String,
        filters: Vec<(String, String)>,
    },
    Insert {
        table: String,
        record: Value,
    },
    Rpc {
        function: String,
        args: Value,
    },
}

#[derive(Default)]
struct Inner {
    tables: DashMap<String, Vec<Value>>,
    unique: DashMap<String, Vec<String>>,
    procedures: DashMap<String, Value>,
    calls: Mutex<Vec<StoreCall>>,
    next_id: AtomicI64,
    unavailable: AtomicBool,
}

/// In-process stand-in for the remote store.
///
/// Tables are plain JSON rows. Stored procedures are not evaluated; they
/// return whatever was registered with [`MemoryStore::with_procedure`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects inserts into `table` that repeat an existing `column` value.
    pub fn with_unique(self, table: &str, column: &str) -> Self {
        self.inner
            .unique
            .entry(table.to_string())
            .or_default()
            .push(column.to_string());
        self
    }

    pub fn with_procedure(self, function: &str, result: Value) -> Self {
        self.inner.procedures.insert(function.to_string(), result);
        self
    }

    pub fn with_row(self, table: &str, row: Value) -> Self {
        self.inner
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row);
        self
    }

    /// Makes every subsequent call fail as if the remote service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.inner
            .tables
            .get(table)
            .map(|rows| rows.value().clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock_calls().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<StoreCall>> {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: StoreCall) -> Result<(), StoreError> {
        self.lock_calls().push(call);
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                body: "memory store marked unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn select_now(&self, table: &str, columns: &str, filters: &[(&str, &str)]) -> Vec<Value> {
        let Some(rows) = self.inner.tables.get(table) else {
            return Vec::new();
        };

        rows.iter()
            .filter(|row| {
                filters
                    .iter()
                    .all(|(column, value)| row.get(*column).map(filter_text).as_deref() == Some(*value))
            })
            .map(|row| project(row, columns))
            .collect()
    }

    fn insert_now(&self, table: &str, record: Value) -> Result<(), StoreError> {
        let Value::Object(mut record) = record else {
            return Err(StoreError::Status {
                status: 400,
                body: format!("record for {table} is not an object"),
            });
        };

        let mut rows = self.inner.tables.entry(table.to_string()).or_default();

        if let Some(columns) = self.inner.unique.get(table) {
            for column in columns.iter() {
                let candidate = record.get(column);
                let duplicate = candidate.is_some()
                    && rows.iter().any(|row| row.get(column) == candidate);
                if duplicate {
                    return Err(StoreError::Conflict(format!(
                        "duplicate key value violates unique constraint on {table}.{column}"
                    )));
                }
            }
        }

        if !record.contains_key("id") {
            let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            record.insert("id".to_string(), Value::from(id));
        }

        rows.push(Value::Object(record));
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("tables", &self.inner.tables.len())
            .field("calls", &self.call_count())
            .finish()
    }
}

/// Text form of a column value as it would appear in an `eq.` filter.
fn filter_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn project(row: &Value, columns: &str) -> Value {
    if columns.trim() == "*" {
        return row.clone();
    }

    let projected: Map<String, Value> = columns
        .split(',')
        .map(str::trim)
        .filter_map(|column| row.get(column).map(|value| (column.to_string(), value.clone())))
        .collect();
    Value::Object(projected)
}

impl PollStore for MemoryStore {
    fn select_eq<'a>(
        &'a self,
        table: &'a str,
        columns: &'a str,
        filters: &'a [(&'a str, &'a str)],
    ) -> StoreFuture<'a, Vec<Value>> {
        Box::pin(async move {
            self.record(StoreCall::Select {
                table: table.to_string(),
                filters: filters
                    .iter()
                    .map(|(column, value)| (column.to_string(), value.to_string()))
                    .collect(),
            })?;
            Ok(self.select_now(table, columns, filters))
        })
    }

    fn insert<'a>(&'a self, table: &'a str, record: Value) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.record(StoreCall::Insert {
                table: table.to_string(),
                record: record.clone(),
            })?;
            self.insert_now(table, record)
        })
    }

    fn rpc<'a>(&'a self, function: &'a str, args: Value) -> StoreFuture<'a, Value> {
        Box::pin(async move {
            self.record(StoreCall::Rpc {
                function: function.to_string(),
                args,
            })?;
            self.inner
                .procedures
                .get(function)
                .map(|result| result.value().clone())
                .ok_or_else(|| StoreError::UnknownProcedure(function.to_string()))
        })
    }
}
