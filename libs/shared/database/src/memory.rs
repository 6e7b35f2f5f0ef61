use std::collections::HashMap;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::query::Query;
use crate::store::RowStore;

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: Vec<Value>,
}

/// Process-local tables for development and tests. Every operation holds the
/// table lock for its whole match-and-write, matching the row-level atomicity
/// a conditional `UPDATE ... WHERE` gives in Postgres.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<&'static str, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn row_count(&self, table: &'static str) -> usize {
        self.tables.lock().await
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }
}

fn merge(target: &mut Value, fields: &Map<String, Value>) {
    if let Value::Object(row) = target {
        for (key, value) in fields {
            row.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn insert_row(&self, table: &'static str, row: Value) -> Result<Value> {
        let Value::Object(mut fields) = row else {
            return Err(anyhow!("Rows inserted into {} must be JSON objects", table));
        };

        let mut tables = self.tables.lock().await;
        let entry = tables.entry(table).or_default();

        let id = match fields.get("id").and_then(Value::as_i64) {
            Some(id) => {
                if entry.rows.iter().any(|r| r.get("id").and_then(Value::as_i64) == Some(id)) {
                    return Err(anyhow!("Duplicate id {} in {}", id, table));
                }
                entry.next_id = entry.next_id.max(id);
                id
            }
            None => {
                entry.next_id += 1;
                entry.next_id
            }
        };
        fields.insert("id".to_string(), Value::from(id));

        let stored = Value::Object(fields);
        entry.rows.push(stored.clone());
        debug!("Inserted row {} into {}", id, table);

        Ok(stored)
    }

    async fn update_rows(&self, query: &Query, fields: Value) -> Result<Vec<Value>> {
        let Value::Object(fields) = fields else {
            return Err(anyhow!("Update for {} must be a JSON object", query.table_name()));
        };

        let mut tables = self.tables.lock().await;
        let Some(table) = tables.get_mut(query.table_name()) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in table.rows.iter_mut().filter(|row| query.matches(row)) {
            merge(row, &fields);
            updated.push(row.clone());
        }

        debug!("Updated {} rows in {}", updated.len(), query.table_name());
        Ok(updated)
    }

    async fn select_rows(&self, query: &Query) -> Result<Vec<Value>> {
        let tables = self.tables.lock().await;
        let rows = tables.get(query.table_name())
            .map(|table| table.rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();

        Ok(query.arrange(rows))
    }

    async fn delete_rows(&self, query: &Query) -> Result<usize> {
        let mut tables = self.tables.lock().await;
        let Some(table) = tables.get_mut(query.table_name()) else {
            return Ok(0);
        };

        let before = table.rows.len();
        table.rows.retain(|row| !query.matches(row));
        Ok(before - table.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn assigns_sequential_ids_per_table() {
        let store = MemoryStore::new();

        let first = store.insert_row("a", json!({"name": "x"})).await.unwrap();
        let second = store.insert_row("a", json!({"name": "y"})).await.unwrap();
        let other = store.insert_row("b", json!({"name": "z"})).await.unwrap();

        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
        assert_eq!(other["id"], 1);
    }

    #[tokio::test]
    async fn conditional_update_only_touches_matching_rows() {
        let store = MemoryStore::new();
        store.insert_row("slots", json!({"status": "available"})).await.unwrap();

        let claim = Query::table("slots").eq("id", 1).eq("status", "available");
        let first = store.update_rows(&claim, json!({"status": "booked"})).await.unwrap();
        let second = store.update_rows(&claim, json!({"status": "booked"})).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first[0]["status"], "booked");
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn delete_reports_removed_count() {
        let store = MemoryStore::new();
        store.insert_row("t", json!({"k": 1})).await.unwrap();
        store.insert_row("t", json!({"k": 2})).await.unwrap();

        let removed = store.delete_rows(&Query::table("t").eq("k", 1)).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.row_count("t").await, 1);
    }

    #[tokio::test]
    async fn rejects_non_object_rows() {
        let store = MemoryStore::new();
        assert!(store.insert_row("t", json!([1, 2])).await.is_err());
    }
}
