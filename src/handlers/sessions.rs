// handlers/sessions.rs - /api/sessions/ viewset and session actions

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query},
    routing::{get, post, MethodRouter},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{Session, SessionPhoto, SessionRecord};
use crate::database::{Repository, Store};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::proctoring::{NewRecord, StartSession};
use crate::services::ProctoringService;

use super::viewset::{QueryParams, TenantEnforcer, ViewSet};

type View = Extension<Arc<TenantEnforcer<SessionViewSet>>>;

#[derive(Debug, Deserialize)]
pub struct NewPhoto {
    pub photo: String,
}

/// Editable session state; exam, taker and company are fixed at start
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSession {
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

pub struct SessionViewSet {
    sessions: Repository<Session>,
    proctoring: Arc<ProctoringService>,
}

impl SessionViewSet {
    pub fn new(store: Arc<dyn Store>, proctoring: Arc<ProctoringService>) -> Self {
        Self {
            sessions: Repository::new(store),
            proctoring,
        }
    }

    pub fn proctoring(&self) -> &ProctoringService {
        &self.proctoring
    }
}

#[async_trait]
impl ViewSet for SessionViewSet {
    type Model = Session;

    fn repository(&self) -> &Repository<Session> {
        &self.sessions
    }

    /// `?taker=<username>&exam=<exam_code>&proctor=<username>`
    async fn get_queryset(&self, params: &QueryParams) -> Result<FilterData, ApiError> {
        let param = |name: &str| params.get(name).map(String::as_str).filter(|v| !v.is_empty());
        Ok(self
            .proctoring
            .session_query(param("taker"), param("exam"), param("proctor"))
            .await?)
    }
}

pub fn routes() -> Vec<(&'static str, MethodRouter<AppState>)> {
    vec![
        ("/api/sessions/", get(list).post(start_session)),
        ("/api/sessions/:id/", get(retrieve).put(update).patch(update).delete(destroy)),
        ("/api/sessions/:id/end_session/", post(end_session)),
        ("/api/sessions/:id/add_photo/", post(add_photo)),
        ("/api/sessions/:id/add_record/", post(add_record)),
        ("/api/sessions/:id/photos/", get(photos)),
        ("/api/sessions/:id/records/", get(records)),
    ]
}

/// GET /api/sessions/
async fn list(Extension(view): View, Query(params): Query<QueryParams>) -> ApiResult<Vec<Session>> {
    Ok(ApiResponse::success(view.list(&params).await?))
}

/// POST /api/sessions/ - `{ "exam": code, "taker": username, "proctor": username? }`
async fn start_session(Extension(view): View, ApiJson(body): ApiJson<StartSession>) -> ApiResult<Session> {
    let session = view.inner().proctoring().start_session(body).await?;
    Ok(ApiResponse::created(session))
}

/// GET /api/sessions/:id/
async fn retrieve(Extension(view): View, Path(id): Path<i64>, Query(params): Query<QueryParams>) -> ApiResult<Session> {
    Ok(ApiResponse::success(view.get_object(&params, id).await?))
}

/// PUT|PATCH /api/sessions/:id/
async fn update(
    Extension(view): View,
    Path(id): Path<i64>,
    Query(params): Query<QueryParams>,
    ApiJson(body): ApiJson<UpdateSession>,
) -> ApiResult<Session> {
    let mut session = view.get_object(&params, id).await?;
    if let Some(is_active) = body.is_active {
        session.is_active = is_active;
    }
    if body.end_time.is_some() {
        session.end_time = body.end_time;
    }
    view.repository().save(&mut session).await?;
    Ok(ApiResponse::success(session))
}

/// DELETE /api/sessions/:id/ - photos and records go with it
async fn destroy(Extension(view): View, Path(id): Path<i64>, Query(params): Query<QueryParams>) -> ApiResult<()> {
    let session = view.get_object(&params, id).await?;
    view.inner().proctoring().delete_session(&session).await?;
    Ok(ApiResponse::<()>::no_content())
}

/// POST /api/sessions/:id/end_session/
async fn end_session(Extension(view): View, Path(id): Path<i64>, Query(params): Query<QueryParams>) -> ApiResult<Value> {
    let session = view.get_object(&params, id).await?;
    let session = view.inner().proctoring().end_session(session).await?;
    Ok(ApiResponse::success(json!({
        "detail": "Session successfully ended.",
        "session": session,
    })))
}

/// POST /api/sessions/:id/add_photo/
async fn add_photo(
    Extension(view): View,
    Path(id): Path<i64>,
    Query(params): Query<QueryParams>,
    ApiJson(body): ApiJson<NewPhoto>,
) -> ApiResult<SessionPhoto> {
    let session = view.get_object(&params, id).await?;
    let photo = view.inner().proctoring().add_photo(&session, &body.photo).await?;
    Ok(ApiResponse::created(photo))
}

/// POST /api/sessions/:id/add_record/
async fn add_record(
    Extension(view): View,
    Path(id): Path<i64>,
    Query(params): Query<QueryParams>,
    ApiJson(body): ApiJson<NewRecord>,
) -> ApiResult<SessionRecord> {
    let session = view.get_object(&params, id).await?;
    let record = view.inner().proctoring().add_record(&session, body).await?;
    Ok(ApiResponse::created(record))
}

/// GET /api/sessions/:id/photos/
async fn photos(Extension(view): View, Path(id): Path<i64>, Query(params): Query<QueryParams>) -> ApiResult<Value> {
    let session = view.get_object(&params, id).await?;
    let photos = view.inner().proctoring().photos_for(&session).await?;
    Ok(ApiResponse::success(json!({ "count": photos.len(), "photos": photos })))
}

/// GET /api/sessions/:id/records/
async fn records(Extension(view): View, Path(id): Path<i64>, Query(params): Query<QueryParams>) -> ApiResult<Value> {
    let session = view.get_object(&params, id).await?;
    let records = view.inner().proctoring().records_for(&session).await?;
    Ok(ApiResponse::success(json!({ "count": records.len(), "records": records })))
}
