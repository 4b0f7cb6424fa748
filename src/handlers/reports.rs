// handlers/reports.rs - Per-exam reporting endpoints
//
// Plain function handlers: the interceptor sets the request context but does
// not instrument them, so narrowing comes from the repositories alone.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    routing::{get, MethodRouter},
};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::proctoring::{SortOrder, TakerSessions, TakerSummary};

pub fn routes() -> Vec<(&'static str, MethodRouter<AppState>)> {
    vec![
        ("/api/takers/:exam_code/", get(takers_by_exam)),
        ("/api/exam-sessions/:exam_code/:taker_username/", get(sessions_by_exam_and_taker)),
    ]
}

/// GET /api/takers/:exam_code/
async fn takers_by_exam(State(state): State<AppState>, Path(exam_code): Path<String>) -> ApiResult<Vec<TakerSummary>> {
    let takers = state.proctoring.takers_by_exam(&exam_code).await?;
    Ok(ApiResponse::success(takers))
}

/// GET /api/exam-sessions/:exam_code/:taker_username/?sort=asc|desc
async fn sessions_by_exam_and_taker(
    State(state): State<AppState>,
    Path((exam_code, taker_username)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<TakerSessions> {
    let sort = SortOrder::parse(params.get("sort").map(String::as_str));
    let sessions = state
        .proctoring
        .sessions_by_exam_and_taker(&exam_code, &taker_username, sort)
        .await?;
    Ok(ApiResponse::success(sessions))
}
