use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::config;
use crate::filter::FilterError;
use crate::tenancy::TenancyError;

/// DDL for every table the service owns
pub const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Tenancy(#[from] TenancyError),
}

impl From<FilterError> for DatabaseError {
    fn from(err: FilterError) -> Self {
        DatabaseError::QueryError(err.to_string())
    }
}

/// Process-wide Postgres pool, created lazily from DATABASE_URL
pub struct DatabaseManager {
    pool: RwLock<Option<PgPool>>,
}

impl DatabaseManager {
    fn instance() -> &'static DatabaseManager {
        static INSTANCE: OnceLock<DatabaseManager> = OnceLock::new();
        INSTANCE.get_or_init(|| DatabaseManager { pool: RwLock::new(None) })
    }

    /// Get the shared pool, connecting on first use
    pub async fn pool() -> Result<PgPool, DatabaseError> {
        let manager = Self::instance();
        {
            let pool = manager.pool.read().await;
            if let Some(pool) = pool.as_ref() {
                return Ok(pool.clone());
            }
        }

        let mut slot = manager.pool.write().await;
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }

        let url = Self::database_url()?;
        let db = &config().database;
        let pool = PgPoolOptions::new()
            .max_connections(db.max_connections)
            .acquire_timeout(Duration::from_secs(db.connection_timeout))
            .connect(&url)
            .await?;
        info!("Created database pool (max_connections={})", db.max_connections);
        *slot = Some(pool.clone());
        Ok(pool)
    }

    pub fn database_url() -> Result<String, DatabaseError> {
        std::env::var("DATABASE_URL").map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))
    }

    /// Apply the bundled schema; every statement is idempotent
    pub async fn apply_schema(pool: &PgPool) -> Result<(), DatabaseError> {
        pool.execute(SCHEMA_SQL).await?;
        info!("Applied database schema");
        Ok(())
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close() {
        let mut slot = Self::instance().pool.write().await;
        if let Some(pool) = slot.take() {
            pool.close().await;
            info!("Closed database pool");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_declares_tenant_columns() {
        for table in ["users", "exams", "sessions", "session_records", "session_photos", "base_images"] {
            let create = format!("CREATE TABLE IF NOT EXISTS {}", table);
            let start = SCHEMA_SQL.find(&create).unwrap_or_else(|| panic!("missing table {}", table));
            let body = &SCHEMA_SQL[start..];
            let end = body.find(");").unwrap();
            assert!(body[..end].contains("company_id BIGINT NOT NULL"), "{} lacks company_id", table);
        }
        assert!(SCHEMA_SQL.contains("UNIQUE (company_id, exam_code)"));
    }

    #[test]
    fn tenancy_errors_convert() {
        let err: DatabaseError = TenancyError::TenantRequired.into();
        assert!(matches!(err, DatabaseError::Tenancy(TenancyError::TenantRequired)));
    }
}
