use std::sync::Arc;

use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::database::{DatabaseManager, PgStore, Store};

/// Postgres-backed store from DATABASE_URL
pub async fn open_store() -> anyhow::Result<Arc<dyn Store>> {
    let pool = DatabaseManager::pool()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    Ok(Arc::new(PgStore::new(pool)))
}

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let Some(data_value) = data {
                response["data"] = data_value;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a collection as a JSON array or as aligned text rows
pub fn output_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    items: Vec<Value>,
    headers: &[&str],
    row: impl Fn(&Value) -> Vec<String>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: items }))?);
        }
        OutputFormat::Text if items.is_empty() => {
            println!("No {} found", collection_name);
        }
        OutputFormat::Text => {
            println!("{}", format_row(headers.iter().map(|h| h.to_string()).collect()));
            println!("{}", "-".repeat(21 * headers.len()));
            for item in &items {
                println!("{}", format_row(row(item)));
            }
        }
    }
    Ok(())
}

fn format_row(cells: Vec<String>) -> String {
    let padded: Vec<String> = cells.iter().map(|c| format!("{:<20}", c)).collect();
    padded.join(" ").trim_end().to_string()
}

/// Render a JSON scalar for text output
pub fn cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
