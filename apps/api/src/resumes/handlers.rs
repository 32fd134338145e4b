use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::files::handlers::read_multipart;
use crate::files::{resolve_type, MAX_RESUME_BYTES, RESUME_TYPES};
use crate::jobs::non_blank;
use crate::lookups::{repository as lookups, LookupKind};
use crate::models::resume::{FileMeta, ResumeRow, ResumeSummary, WorkExperienceRow};
use crate::plans::enforcement::{ensure_can_add_resume, ensure_storage_available};
use crate::resumes::repository::{self, NewWorkExperience};
use crate::resumes::{upload_title, validate_date_range, validate_title};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateResumeRequest {
    pub title: String,
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateResumeRequest {
    pub title: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperienceRequest {
    pub company_id: Uuid,
    pub job_title_id: Uuid,
    pub location_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDetail {
    #[serde(flatten)]
    pub resume: ResumeRow,
    pub file: Option<FileMeta>,
    pub work_experiences: Vec<WorkExperienceRow>,
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ResumeSummary>>, AppError> {
    Ok(Json(repository::list(&state.db, user.id).await?))
}

/// POST /api/v1/resumes
pub async fn handle_create_resume(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateResumeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ResumeRow>), AppError> {
    let Json(req) = payload?;
    let title = validate_title(&req.title)?;
    let summary = non_blank(req.summary);

    ensure_can_add_resume(state.usage.as_ref(), user.id, user.plan()).await?;

    let resume = repository::create(&state.db, user.id, &title, summary.as_deref()).await?;
    info!("User {} created resume {}", user.id, resume.id);
    Ok((StatusCode::CREATED, Json(resume)))
}

/// POST /api/v1/resumes/upload
///
/// Multipart with a `file` part (PDF, DOC, or DOCX, at most 10 MB) and an
/// optional `title` part.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeRow>), AppError> {
    let upload = read_multipart(multipart, MAX_RESUME_BYTES, "resume file").await?;

    let file_type = resolve_type(RESUME_TYPES, &upload.file_name, upload.content_type.as_deref())
        .ok_or_else(|| AppError::Validation("Resumes must be PDF, DOC, or DOCX files".to_string()))?;
    let title = upload_title(
        upload.fields.get("title").map(String::as_str),
        &upload.file_name,
    )?;

    let plan = user.plan();
    ensure_can_add_resume(state.usage.as_ref(), user.id, plan).await?;
    ensure_storage_available(
        state.usage.as_ref(),
        user.id,
        plan,
        upload.bytes.len() as i64,
    )
    .await?;

    let resume = repository::create_with_file(
        &state.db,
        user.id,
        &title,
        &upload.file_name,
        file_type,
        &upload.bytes,
    )
    .await?;
    info!(
        "User {} uploaded resume {} ({} bytes, {file_type})",
        user.id,
        resume.id,
        upload.bytes.len()
    );
    Ok((StatusCode::CREATED, Json(resume)))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeDetail>, AppError> {
    let resume = repository::find(&state.db, user.id, id).await?;
    let file = match resume.file_id {
        Some(file_id) => repository::file_meta(&state.db, file_id).await?,
        None => None,
    };
    let work_experiences = repository::work_experiences(&state.db, resume.id).await?;
    Ok(Json(ResumeDetail {
        resume,
        file,
        work_experiences,
    }))
}

/// PATCH /api/v1/resumes/:id
pub async fn handle_update_resume(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateResumeRequest>, JsonRejection>,
) -> Result<Json<ResumeRow>, AppError> {
    let Json(req) = payload?;
    let stored = repository::find(&state.db, user.id, id).await?;

    let title = match req.title {
        Some(title) => validate_title(&title)?,
        None => stored.title,
    };
    let summary = match req.summary {
        Some(summary) => non_blank(Some(summary)),
        None => stored.summary,
    };

    Ok(Json(
        repository::update(&state.db, user.id, id, &title, summary.as_deref()).await?,
    ))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    repository::delete(&state.db, user.id, id).await?;
    info!("User {} deleted resume {id}", user.id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/resumes/:id/work-experiences
pub async fn handle_add_work_experience(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(resume_id): Path<Uuid>,
    payload: Result<Json<WorkExperienceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<WorkExperienceRow>), AppError> {
    let Json(req) = payload?;
    validate_date_range(req.start_date, req.end_date)?;

    let resume = repository::find(&state.db, user.id, resume_id).await?;
    lookups::ensure_owned(&state.db, LookupKind::Company, user.id, req.company_id).await?;
    lookups::ensure_owned(&state.db, LookupKind::JobTitle, user.id, req.job_title_id).await?;
    if let Some(location_id) = req.location_id {
        lookups::ensure_owned(&state.db, LookupKind::Location, user.id, location_id).await?;
    }

    let entry = NewWorkExperience {
        company_id: req.company_id,
        job_title_id: req.job_title_id,
        location_id: req.location_id,
        start_date: req.start_date,
        end_date: req.end_date,
        description: req.description.trim().to_string(),
    };
    let row = repository::add_work_experience(&state.db, resume.id, &entry).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// DELETE /api/v1/resumes/:id/work-experiences/:we_id
pub async fn handle_delete_work_experience(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((resume_id, we_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    repository::delete_work_experience(&state.db, user.id, resume_id, we_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
