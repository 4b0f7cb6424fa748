// handlers/users.rs - /api/users/ viewset and its base image action

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query},
    routing::{get, MethodRouter},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::User;
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::users::{ImageUpload, UserBaseImages};
use crate::services::UserService;

use super::viewset::{QueryParams, TenantEnforcer, ViewSet};

type View = Extension<Arc<TenantEnforcer<UserViewSet>>>;

#[derive(Debug, Deserialize)]
pub struct UploadImages {
    #[serde(default)]
    pub images: Vec<ImageUpload>,
}

/// Profile fields a user record may change. Username, company and
/// superuser status are managed through the admin CLI.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

pub struct UserViewSet {
    service: Arc<UserService>,
}

impl UserViewSet {
    pub fn new(service: Arc<UserService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &UserService {
        &self.service
    }
}

#[async_trait]
impl ViewSet for UserViewSet {
    type Model = User;

    fn repository(&self) -> &Repository<User> {
        self.service.users()
    }

    async fn get_queryset(&self, params: &QueryParams) -> Result<FilterData, ApiError> {
        let mut query = FilterData::default().order_by("username asc");
        if let Some(username) = params.get("username") {
            query = query.and_where(json!({ "username": username }));
        }
        Ok(query)
    }
}

pub fn routes() -> Vec<(&'static str, MethodRouter<AppState>)> {
    vec![
        ("/api/users/", get(list)),
        ("/api/users/:id/", get(retrieve).patch(partial_update)),
        (
            "/api/users/:id/base_images/",
            get(base_images_get).post(base_images_post).delete(base_images_delete),
        ),
    ]
}

/// GET /api/users/
async fn list(Extension(view): View, Query(params): Query<QueryParams>) -> ApiResult<Vec<Value>> {
    let users = view.list(&params).await?;
    Ok(ApiResponse::success(users.iter().map(User::to_public).collect()))
}

/// GET /api/users/:id/
async fn retrieve(Extension(view): View, Path(id): Path<i64>, Query(params): Query<QueryParams>) -> ApiResult<Value> {
    Ok(ApiResponse::success(view.get_object(&params, id).await?.to_public()))
}

/// PATCH /api/users/:id/
async fn partial_update(
    Extension(view): View,
    Path(id): Path<i64>,
    Query(params): Query<QueryParams>,
    ApiJson(body): ApiJson<UpdateUser>,
) -> ApiResult<Value> {
    let mut user = view.get_object(&params, id).await?;
    if let Some(name) = body.name {
        user.name = name.trim().to_string();
    }
    if let Some(is_active) = body.is_active {
        user.is_active = is_active;
    }
    view.repository().save(&mut user).await?;
    Ok(ApiResponse::success(user.to_public()))
}

/// GET /api/users/:id/base_images/
async fn base_images_get(Extension(view): View, Path(id): Path<i64>, Query(params): Query<QueryParams>) -> ApiResult<UserBaseImages> {
    let user = view.get_object(&params, id).await?;
    Ok(ApiResponse::success(view.inner().service().base_images(&user).await?))
}

/// POST /api/users/:id/base_images/ - `{ "images": [{ "filename", "size" }] }`
async fn base_images_post(
    Extension(view): View,
    Path(id): Path<i64>,
    Query(params): Query<QueryParams>,
    ApiJson(body): ApiJson<UploadImages>,
) -> ApiResult<UserBaseImages> {
    let user = view.get_object(&params, id).await?;
    let stored = view.inner().service().upload_base_images(&user, &body.images).await?;
    Ok(ApiResponse::created(stored))
}

/// DELETE /api/users/:id/base_images/
async fn base_images_delete(Extension(view): View, Path(id): Path<i64>, Query(params): Query<QueryParams>) -> ApiResult<Value> {
    let user = view.get_object(&params, id).await?;
    let deleted = view.inner().service().delete_base_images(&user).await?;
    Ok(ApiResponse::success(json!({ "user": id, "deleted": deleted })))
}
