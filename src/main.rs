use std::sync::Arc;

use proctor_api::{
    app::build_app,
    config::config,
    database::{DatabaseManager, MemoryStore, PgStore, Store},
    is_production,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("proctor_api=info,tower_http=info")),
        )
        .init();

    let config = config();
    info!("Starting Proctor API in {:?} mode", config.environment);

    let store = open_store().await?;
    let app = build_app(store);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    info!("Proctor API listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    DatabaseManager::close().await;
    Ok(())
}

/// Postgres when DATABASE_URL is set; an in-process store otherwise
async fn open_store() -> anyhow::Result<Arc<dyn Store>> {
    if DatabaseManager::database_url().is_ok() {
        let pool = DatabaseManager::pool().await?;
        DatabaseManager::apply_schema(&pool).await?;
        info!("Using PostgreSQL store");
        return Ok(Arc::new(PgStore::new(pool)));
    }

    if is_production!() {
        anyhow::bail!("DATABASE_URL is required in production");
    }
    warn!("DATABASE_URL not set; data lives in memory and is lost on exit");
    Ok(Arc::new(MemoryStore::new()))
}
