// database/pg_store.rs - Postgres-backed Store
//
// Rows come back through row_to_json and go in through jsonb_populate_record,
// so Postgres does every JSON <-> column type conversion.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{postgres::PgArguments, Arguments, PgPool, Postgres};
use tracing::{debug, error};

use crate::config::config;
use crate::database::manager::DatabaseError;
use crate::database::store::Store;
use crate::filter::{Filter, FilterData, SqlResult};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_rows(&self, sql: SqlResult) -> Result<Vec<Value>, DatabaseError> {
        log_query(&sql);
        sqlx::query_scalar_with::<Postgres, Value, _>(&sql.query, bind_arguments(&sql.params))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Query failed: {} ({})", sql.query, e);
                DatabaseError::from(e)
            })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn select(&self, table: &str, query: &FilterData) -> Result<Vec<Value>, DatabaseError> {
        let sql = Filter::from_data(table, query)?.to_sql()?;
        self.fetch_rows(sql).await
    }

    async fn count(&self, table: &str, query: &FilterData) -> Result<i64, DatabaseError> {
        let sql = Filter::from_data(table, query)?.to_count_sql()?;
        log_query(&sql);
        let count = sqlx::query_scalar_with::<Postgres, i64, _>(&sql.query, bind_arguments(&sql.params))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert(&self, table: &str, row: Map<String, Value>) -> Result<Value, DatabaseError> {
        let sql = insert_sql(table, row)?;
        self.fetch_rows(sql)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::QueryError(format!("insert into {} returned no row", table)))
    }

    async fn update(
        &self,
        table: &str,
        query: &FilterData,
        changes: Map<String, Value>,
    ) -> Result<Vec<Value>, DatabaseError> {
        if changes.is_empty() {
            return self.select(table, query).await;
        }
        let sql = update_sql(table, query, changes)?;
        self.fetch_rows(sql).await
    }

    async fn delete(&self, table: &str, query: &FilterData) -> Result<u64, DatabaseError> {
        let sql = Filter::from_data(table, query)?.to_delete_sql()?;
        log_query(&sql);
        let result = sqlx::query_with(&sql.query, bind_arguments(&sql.params))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}

fn log_query(sql: &SqlResult) {
    if config().database.enable_query_logging {
        debug!("SQL: {} params={:?}", sql.query, sql.params);
    }
}

fn quoted_columns(row: &Map<String, Value>) -> Result<Vec<String>, DatabaseError> {
    row.keys()
        .map(|column| {
            Filter::validate_identifier(column)?;
            Ok(format!("\"{}\"", column))
        })
        .collect()
}

fn insert_sql(table: &str, row: Map<String, Value>) -> Result<SqlResult, DatabaseError> {
    let filter = Filter::new(table)?;
    let table = filter.table_name();
    if row.is_empty() {
        return Ok(SqlResult {
            query: format!("INSERT INTO \"{t}\" DEFAULT VALUES RETURNING row_to_json(\"{t}\") AS row", t = table),
            params: vec![],
        });
    }

    let columns = quoted_columns(&row)?.join(", ");
    let query = format!(
        "INSERT INTO \"{t}\" ({c}) SELECT {c} FROM jsonb_populate_record(NULL::\"{t}\", $1::jsonb) RETURNING row_to_json(\"{t}\") AS row",
        t = table,
        c = columns
    );
    Ok(SqlResult { query, params: vec![Value::Object(row)] })
}

fn update_sql(table: &str, query: &FilterData, changes: Map<String, Value>) -> Result<SqlResult, DatabaseError> {
    let filter = Filter::from_data(table, query)?;
    let table = filter.table_name();
    let assignments = quoted_columns(&changes)?
        .into_iter()
        .map(|column| {
            format!(
                "{c} = (SELECT {c} FROM jsonb_populate_record(NULL::\"{t}\", $1::jsonb))",
                c = column,
                t = table
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    // $1 carries the new values; the where clause starts at $2
    let where_result = filter.to_where_sql_from(1)?;
    let sql = format!(
        "UPDATE \"{t}\" SET {a} WHERE {w} RETURNING row_to_json(\"{t}\") AS row",
        t = table,
        a = assignments,
        w = where_result.query
    );

    let mut params = vec![Value::Object(changes)];
    params.extend(where_result.params);
    Ok(SqlResult { query: sql, params })
}

fn bind_arguments(params: &[Value]) -> PgArguments {
    let mut args = PgArguments::default();
    for v in params {
        match v {
            Value::Null => args.add(None::<String>),
            Value::Bool(b) => args.add(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    args.add(i)
                } else if let Some(f) = n.as_f64() {
                    args.add(f)
                } else {
                    args.add(n.to_string())
                }
            }
            Value::String(s) => args.add(s.clone()),
            // JSONB
            Value::Array(_) | Value::Object(_) => args.add(v.clone()),
        }
    }
    args
}
