// handlers/root.rs - Service banner and health check

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, MethodRouter},
};
use serde_json::{json, Value};

use crate::app::AppState;

pub fn routes() -> Vec<(&'static str, MethodRouter<AppState>)> {
    vec![("/", get(root)), ("/health", get(health))]
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Proctor API",
            "version": env!("CARGO_PKG_VERSION"),
            "store": state.store.kind(),
            "endpoints": {
                "token": "/api/token/ (public)",
                "exams": "/api/exams/[:id/]",
                "users": "/api/users/[:id/[base_images/]]",
                "sessions": "/api/sessions/[:id/[end_session|add_photo|add_record|photos|records/]]",
                "artifacts": "/api/session-photos/, /api/session-records/",
                "reports": "/api/takers/:exam_code/, /api/exam-sessions/:exam_code/:taker_username/",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "store": state.store.kind() }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "store unavailable",
                "data": { "status": "degraded", "timestamp": now, "store_error": e.to_string() }
            })),
        ),
    }
}
