// handlers/exams.rs - /api/exams/ viewset

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
use crate::database::models::Exam;
use crate::database::{Repository, Store};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::ServiceError;
use crate::tenancy::Actor;

use super::viewset::{QueryParams, TenantEnforcer, ViewSet};

type View = Extension<Arc<TenantEnforcer<ExamViewSet>>>;

#[derive(Debug, Deserialize)]
pub struct CreateExam {
    pub exam_title: String,
    pub exam_code: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Honoured for super-actors only; members always create in their own company
    #[serde(default)]
    pub company_id: Option<i64>,
}

/// Fields an existing exam may change; the owning company is not among them
#[derive(Debug, Default, Deserialize)]
pub struct UpdateExam {
    #[serde(default)]
    pub exam_title: Option<String>,
    #[serde(default)]
    pub exam_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

pub struct ExamViewSet {
    exams: Repository<Exam>,
}

impl ExamViewSet {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            exams: Repository::new(store),
        }
    }

    /// Exam codes are unique within a company
    pub async fn create(&self, actor: &Actor, body: CreateExam) -> Result<Exam, ServiceError> {
        let title = body.exam_title.trim();
        let code = body.exam_code.trim();
        if title.is_empty() || code.is_empty() {
            return Err(ServiceError::InvalidState("exam_title and exam_code are required".to_string()));
        }

        let mut exam = Exam::new(title, code);
        exam.description = body.description;
        if actor.is_super_actor {
            exam.company_id = body.company_id;
        }

        if let Some(company_id) = exam.company_id.or(actor.tenant_id) {
            let duplicate = FilterData::where_(json!({ "exam_code": code, "company_id": company_id }));
            if self.exams.exists(duplicate).await? {
                return Err(ServiceError::AlreadyExists(format!("exam code {}", code)));
            }
        }

        self.exams.save(&mut exam).await?;
        Ok(exam)
    }

    pub async fn update(&self, mut exam: Exam, body: UpdateExam) -> Result<Exam, ServiceError> {
        if let Some(title) = body.exam_title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ServiceError::InvalidState("exam_title may not be blank".to_string()));
            }
            exam.exam_title = title.to_string();
        }
        if let Some(code) = body.exam_code {
            let code = code.trim();
            if code.is_empty() {
                return Err(ServiceError::InvalidState("exam_code may not be blank".to_string()));
            }
            if code != exam.exam_code {
                let duplicate = FilterData::where_(json!({
                    "exam_code": code,
                    "company_id": exam.company_id,
                    "id": { "$ne": exam.id },
                }));
                if self.exams.exists(duplicate).await? {
                    return Err(ServiceError::AlreadyExists(format!("exam code {}", code)));
                }
            }
            exam.exam_code = code.to_string();
        }
        if body.description.is_some() {
            exam.description = body.description;
        }

        exam.touch();
        self.exams.save(&mut exam).await?;
        Ok(exam)
    }
}

#[async_trait]
impl ViewSet for ExamViewSet {
    type Model = Exam;

    fn repository(&self) -> &Repository<Exam> {
        &self.exams
    }

    async fn get_queryset(&self, _params: &QueryParams) -> Result<FilterData, ApiError> {
        Ok(FilterData::default().order_by("id asc"))
    }
}

pub fn routes() -> Vec<(&'static str, MethodRouter<AppState>)> {
    vec![
        ("/api/exams/", get(list).post(create)),
        ("/api/exams/:id/", get(retrieve).put(update).patch(update).delete(destroy)),
    ]
}

/// GET /api/exams/
async fn list(Extension(view): View, Query(params): Query<QueryParams>) -> ApiResult<Vec<Exam>> {
    Ok(ApiResponse::success(view.list(&params).await?))
}

/// POST /api/exams/
async fn create(Extension(view): View, Extension(actor): Extension<Actor>, ApiJson(body): ApiJson<CreateExam>) -> ApiResult<Exam> {
    let exam = view.inner().create(&actor, body).await?;
    Ok(ApiResponse::created(exam))
}

/// GET /api/exams/:id/
async fn retrieve(Extension(view): View, Path(id): Path<i64>, Query(params): Query<QueryParams>) -> ApiResult<Exam> {
    Ok(ApiResponse::success(view.get_object(&params, id).await?))
}

/// PUT|PATCH /api/exams/:id/ - fields left out of the body are kept
async fn update(
    Extension(view): View,
    Path(id): Path<i64>,
    Query(params): Query<QueryParams>,
    ApiJson(body): ApiJson<UpdateExam>,
) -> ApiResult<Exam> {
    let exam = view.get_object(&params, id).await?;
    Ok(ApiResponse::success(view.inner().update(exam, body).await?))
}

/// DELETE /api/exams/:id/
async fn destroy(Extension(view): View, Path(id): Path<i64>, Query(params): Query<QueryParams>) -> ApiResult<()> {
    view.destroy(&params, id).await?;
    Ok(ApiResponse::<()>::no_content())
}
