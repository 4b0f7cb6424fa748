// database/memory_store.rs - In-process Store for tests and database-less runs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::store::Store;
use crate::filter::{Filter, FilterData, Matcher};

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, Value>,
    next_id: i64,
}

impl Table {
    fn allocate_id(&mut self, requested: Option<i64>) -> i64 {
        let id = requested.unwrap_or(self.next_id + 1);
        self.next_id = self.next_id.max(id);
        id
    }

    /// Ids of rows matching `query`, in the order the query asks for
    fn matching_ids(&self, query: &FilterData) -> Result<Vec<i64>, DatabaseError> {
        let rows = Matcher::apply(query, self.rows.values().cloned().collect())?;
        Ok(rows.iter().filter_map(|row| row.get("id").and_then(Value::as_i64)).collect())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn project(row: Value, select: &Option<Vec<String>>) -> Value {
    match (select, row) {
        (Some(columns), Value::Object(map)) if !columns.iter().any(|c| c == "*") && !columns.is_empty() => {
            Value::Object(map.into_iter().filter(|(k, _)| columns.contains(k)).collect())
        }
        (_, row) => row,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, table: &str, query: &FilterData) -> Result<Vec<Value>, DatabaseError> {
        Filter::from_data(table, query)?;
        let tables = self.tables.read().await;
        let Some(t) = tables.get(table) else {
            return Ok(vec![]);
        };
        let rows = Matcher::apply(query, t.rows.values().cloned().collect())?;
        Ok(rows.into_iter().map(|row| project(row, &query.select)).collect())
    }

    async fn count(&self, table: &str, query: &FilterData) -> Result<i64, DatabaseError> {
        // COUNT ignores order and paging
        let where_only = FilterData {
            where_clause: query.where_clause.clone(),
            ..Default::default()
        };
        Filter::from_data(table, &where_only)?;
        let tables = self.tables.read().await;
        match tables.get(table) {
            Some(t) => Ok(t.matching_ids(&where_only)?.len() as i64),
            None => Ok(0),
        }
    }

    async fn insert(&self, table: &str, mut row: Map<String, Value>) -> Result<Value, DatabaseError> {
        Filter::new(table)?;
        for column in row.keys() {
            Filter::validate_identifier(column)?;
        }

        let mut tables = self.tables.write().await;
        let t = tables.entry(table.to_string()).or_default();
        let requested = row.get("id").and_then(Value::as_i64);
        if requested.is_some_and(|id| t.rows.contains_key(&id)) {
            return Err(DatabaseError::QueryError(format!("duplicate id in {}", table)));
        }
        let id = t.allocate_id(requested);
        row.insert("id".to_string(), Value::from(id));

        let stored = Value::Object(row);
        t.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        table: &str,
        query: &FilterData,
        changes: Map<String, Value>,
    ) -> Result<Vec<Value>, DatabaseError> {
        Filter::from_data(table, query)?;
        for column in changes.keys() {
            Filter::validate_identifier(column)?;
        }

        let mut tables = self.tables.write().await;
        let Some(t) = tables.get_mut(table) else {
            return Ok(vec![]);
        };

        let mut updated = Vec::new();
        for id in t.matching_ids(query)? {
            if let Some(Value::Object(row)) = t.rows.get_mut(&id) {
                for (column, value) in &changes {
                    row.insert(column.clone(), value.clone());
                }
                updated.push(Value::Object(row.clone()));
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, query: &FilterData) -> Result<u64, DatabaseError> {
        Filter::from_data(table, query)?;
        let mut tables = self.tables.write().await;
        let Some(t) = tables.get_mut(table) else {
            return Ok(0);
        };

        let ids = t.matching_ids(query)?;
        for id in &ids {
            t.rows.remove(id);
        }
        Ok(ids.len() as u64)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
