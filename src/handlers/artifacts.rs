// handlers/artifacts.rs - Viewsets over session photos and recordings

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query},
    routing::{get, MethodRouter},
    Extension,
};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::database::models::{RecordingType, SessionPhoto, SessionRecord};
use crate::database::{Repository, Store};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};

use super::viewset::{QueryParams, TenantEnforcer, ViewSet};

/// `?session=<id>` narrows either listing to one session
fn by_session(params: &QueryParams) -> Result<FilterData, ApiError> {
    let query = FilterData::default().order_by("id asc");
    match params.get("session") {
        Some(raw) => {
            let id: i64 = raw
                .parse()
                .map_err(|_| ApiError::field_error("session", "must be an integer"))?;
            Ok(query.and_where(json!({ "session_id": id })))
        }
        None => Ok(query),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePhoto {
    pub photo: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRecord {
    #[serde(default)]
    pub recording_type: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
}

pub struct SessionPhotoViewSet {
    photos: Repository<SessionPhoto>,
}

impl SessionPhotoViewSet {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            photos: Repository::new(store),
        }
    }
}

#[async_trait]
impl ViewSet for SessionPhotoViewSet {
    type Model = SessionPhoto;

    fn repository(&self) -> &Repository<SessionPhoto> {
        &self.photos
    }

    async fn get_queryset(&self, params: &QueryParams) -> Result<FilterData, ApiError> {
        by_session(params)
    }
}

pub struct SessionRecordViewSet {
    records: Repository<SessionRecord>,
}

impl SessionRecordViewSet {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            records: Repository::new(store),
        }
    }
}

#[async_trait]
impl ViewSet for SessionRecordViewSet {
    type Model = SessionRecord;

    fn repository(&self) -> &Repository<SessionRecord> {
        &self.records
    }

    async fn get_queryset(&self, params: &QueryParams) -> Result<FilterData, ApiError> {
        by_session(params)
    }
}

pub fn photo_routes() -> Vec<(&'static str, MethodRouter<AppState>)> {
    vec![
        ("/api/session-photos/", get(list_photos)),
        (
            "/api/session-photos/:id/",
            get(retrieve_photo).put(update_photo).patch(update_photo).delete(destroy_photo),
        ),
    ]
}

pub fn record_routes() -> Vec<(&'static str, MethodRouter<AppState>)> {
    vec![
        ("/api/session-records/", get(list_records)),
        (
            "/api/session-records/:id/",
            get(retrieve_record).put(update_record).patch(update_record).delete(destroy_record),
        ),
    ]
}

type PhotoView = Extension<Arc<TenantEnforcer<SessionPhotoViewSet>>>;
type RecordView = Extension<Arc<TenantEnforcer<SessionRecordViewSet>>>;

async fn list_photos(Extension(view): PhotoView, Query(params): Query<QueryParams>) -> ApiResult<Vec<SessionPhoto>> {
    Ok(ApiResponse::success(view.list(&params).await?))
}

async fn retrieve_photo(
    Extension(view): PhotoView,
    Path(id): Path<i64>,
    Query(params): Query<QueryParams>,
) -> ApiResult<SessionPhoto> {
    Ok(ApiResponse::success(view.get_object(&params, id).await?))
}

async fn update_photo(
    Extension(view): PhotoView,
    Path(id): Path<i64>,
    Query(params): Query<QueryParams>,
    ApiJson(body): ApiJson<UpdatePhoto>,
) -> ApiResult<SessionPhoto> {
    let mut photo = view.get_object(&params, id).await?;
    photo.replace(&body.photo)?;
    view.repository().save(&mut photo).await?;
    Ok(ApiResponse::success(photo))
}

async fn destroy_photo(Extension(view): PhotoView, Path(id): Path<i64>, Query(params): Query<QueryParams>) -> ApiResult<()> {
    view.destroy(&params, id).await?;
    Ok(ApiResponse::<()>::no_content())
}

async fn list_records(Extension(view): RecordView, Query(params): Query<QueryParams>) -> ApiResult<Vec<SessionRecord>> {
    Ok(ApiResponse::success(view.list(&params).await?))
}

async fn retrieve_record(
    Extension(view): RecordView,
    Path(id): Path<i64>,
    Query(params): Query<QueryParams>,
) -> ApiResult<SessionRecord> {
    Ok(ApiResponse::success(view.get_object(&params, id).await?))
}

async fn update_record(
    Extension(view): RecordView,
    Path(id): Path<i64>,
    Query(params): Query<QueryParams>,
    ApiJson(body): ApiJson<UpdateRecord>,
) -> ApiResult<SessionRecord> {
    let mut record = view.get_object(&params, id).await?;
    let recording_type = body.recording_type.as_deref().map(str::parse::<RecordingType>).transpose()?;
    record.replace(recording_type, body.file.as_deref())?;
    view.repository().save(&mut record).await?;
    Ok(ApiResponse::success(record))
}

async fn destroy_record(Extension(view): RecordView, Path(id): Path<i64>, Query(params): Query<QueryParams>) -> ApiResult<()> {
    view.destroy(&params, id).await?;
    Ok(ApiResponse::<()>::no_content())
}
