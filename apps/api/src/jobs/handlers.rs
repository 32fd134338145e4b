use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::jobs::repository::{self, JobFields};
use crate::jobs::{
    non_blank, resolve_applied_date, validate_description, validate_job_type, JobListQuery, Page,
};
use crate::lookups::{repository as lookups, LookupKind};
use crate::models::job::{JobDetail, ReferenceRow};
use crate::plans::enforcement::ensure_can_mark_applied;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub job_title_id: Uuid,
    pub company_id: Uuid,
    pub location_id: Uuid,
    pub status_id: Uuid,
    pub source_id: Option<Uuid>,
    pub job_type: String,
    pub description: String,
    pub job_url: Option<String>,
    pub salary_range: Option<String>,
    #[serde(default)]
    pub applied: bool,
    pub applied_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub job_title_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub status_id: Option<Uuid>,
    pub source_id: Option<Uuid>,
    pub job_type: Option<String>,
    pub description: Option<String>,
    pub job_url: Option<String>,
    pub salary_range: Option<String>,
    pub applied: Option<bool>,
    pub applied_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListResponse {
    pub jobs: Vec<JobDetail>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

async fn ensure_references(pool: &PgPool, user_id: Uuid, fields: &JobFields) -> Result<(), AppError> {
    lookups::ensure_owned(pool, LookupKind::JobTitle, user_id, fields.job_title_id).await?;
    lookups::ensure_owned(pool, LookupKind::Company, user_id, fields.company_id).await?;
    lookups::ensure_owned(pool, LookupKind::Location, user_id, fields.location_id).await?;
    repository::ensure_status_exists(pool, fields.status_id).await?;
    if let Some(source_id) = fields.source_id {
        repository::ensure_source_exists(pool, source_id).await?;
    }
    Ok(())
}

/// GET /api/v1/job-statuses
pub async fn handle_list_statuses(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReferenceRow>>, AppError> {
    Ok(Json(repository::statuses(&state.db).await?))
}

/// GET /api/v1/job-sources
pub async fn handle_list_sources(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReferenceRow>>, AppError> {
    Ok(Json(repository::sources(&state.db).await?))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<JobListQuery>,
) -> Result<Json<JobListResponse>, AppError> {
    let page = Page::from_query(query.page, query.limit);
    let (jobs, total) = repository::list(&state.db, user.id, &query, page).await?;
    Ok(Json(JobListResponse {
        jobs,
        total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages(total),
    }))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JobDetail>), AppError> {
    let Json(req) = payload?;

    let fields = JobFields {
        job_title_id: req.job_title_id,
        company_id: req.company_id,
        location_id: req.location_id,
        status_id: req.status_id,
        source_id: req.source_id,
        job_type: validate_job_type(&req.job_type)?,
        description: validate_description(&req.description)?,
        job_url: non_blank(req.job_url),
        salary_range: non_blank(req.salary_range),
        applied: req.applied,
        applied_date: resolve_applied_date(req.applied, None, req.applied_date, Utc::now()),
        due_date: req.due_date,
    };
    ensure_references(&state.db, user.id, &fields).await?;

    if fields.applied {
        ensure_can_mark_applied(state.usage.as_ref(), user.id, user.plan(), false).await?;
    }

    let id = repository::insert(&state.db, user.id, &fields).await?;
    info!("User {} created job {id} (applied: {})", user.id, fields.applied);

    let job = repository::find_detail(&state.db, user.id, id).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<JobDetail>, AppError> {
    Ok(Json(repository::find_detail(&state.db, user.id, id).await?))
}

/// PATCH /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateJobRequest>, JsonRejection>,
) -> Result<Json<JobDetail>, AppError> {
    let Json(req) = payload?;
    let stored = repository::find_row(&state.db, user.id, id).await?;

    let applied = req.applied.unwrap_or(stored.applied);
    let fields = JobFields {
        job_title_id: req.job_title_id.unwrap_or(stored.job_title_id),
        company_id: req.company_id.unwrap_or(stored.company_id),
        location_id: req.location_id.unwrap_or(stored.location_id),
        status_id: req.status_id.unwrap_or(stored.status_id),
        source_id: req.source_id.or(stored.source_id),
        job_type: match req.job_type {
            Some(job_type) => validate_job_type(&job_type)?,
            None => stored.job_type,
        },
        description: match req.description {
            Some(description) => validate_description(&description)?,
            None => stored.description,
        },
        job_url: match req.job_url {
            Some(url) => non_blank(Some(url)),
            None => stored.job_url,
        },
        salary_range: match req.salary_range {
            Some(range) => non_blank(Some(range)),
            None => stored.salary_range,
        },
        applied,
        applied_date: resolve_applied_date(
            applied,
            stored.applied_date,
            req.applied_date,
            Utc::now(),
        ),
        due_date: req.due_date.or(stored.due_date),
    };
    ensure_references(&state.db, user.id, &fields).await?;

    if applied {
        ensure_can_mark_applied(state.usage.as_ref(), user.id, user.plan(), stored.applied).await?;
    }

    repository::update(&state.db, user.id, id, &fields).await?;
    if applied && !stored.applied {
        info!("User {} marked job {id} applied", user.id);
    }

    Ok(Json(repository::find_detail(&state.db, user.id, id).await?))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    repository::delete(&state.db, user.id, id).await?;
    info!("User {} deleted job {id}", user.id);
    Ok(StatusCode::NO_CONTENT)
}
