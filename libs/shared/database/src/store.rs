use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::query::Query;

/// Row-level access to the relational store backing the scheduling core.
///
/// Services hold an `Arc<dyn RowStore>` and build a fresh [`Query`] for every
/// call, so no filter state outlives the request that produced it.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Inserts one row and returns it as stored, including its assigned `id`.
    async fn insert_row(&self, table: &'static str, row: Value) -> Result<Value>;

    /// Applies `fields` to every row matching `query` and returns the updated
    /// rows. The match and the write are a single atomic step, so a filter on
    /// the current value acts as a compare-and-set.
    async fn update_rows(&self, query: &Query, fields: Value) -> Result<Vec<Value>>;

    async fn select_rows(&self, query: &Query) -> Result<Vec<Value>>;

    /// Deletes matching rows and returns how many were removed.
    async fn delete_rows(&self, query: &Query) -> Result<usize>;
}
