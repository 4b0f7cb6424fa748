use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    DatabaseManager::apply_schema(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to apply schema: {}", e))?;
    output_success(&output_format, "Schema is up to date", None)
}
