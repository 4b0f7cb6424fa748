// database/store.rs - Row-level persistence primitives
//
// Rows are JSON objects keyed by column name. Implementations never apply
// company narrowing themselves; Repository does that before calling in.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::database::manager::DatabaseError;
use crate::filter::FilterData;

#[async_trait]
pub trait Store: Send + Sync {
    /// Rows matching `query`, honouring its order, limit and offset
    async fn select(&self, table: &str, query: &FilterData) -> Result<Vec<Value>, DatabaseError>;

    async fn count(&self, table: &str, query: &FilterData) -> Result<i64, DatabaseError>;

    /// Insert one row and return it as stored, including the assigned id
    async fn insert(&self, table: &str, row: Map<String, Value>) -> Result<Value, DatabaseError>;

    /// Overwrite `changes` on every row matching `query`; returns the updated rows
    async fn update(
        &self,
        table: &str,
        query: &FilterData,
        changes: Map<String, Value>,
    ) -> Result<Vec<Value>, DatabaseError>;

    /// Returns the number of rows removed
    async fn delete(&self, table: &str, query: &FilterData) -> Result<u64, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;

    /// Short backend name for logs and the health endpoint
    fn kind(&self) -> &'static str;
}
