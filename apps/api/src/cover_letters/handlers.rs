use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::cover_letters::{repository, require_text, MAX_CONTENT_CHARS};
use crate::errors::AppError;
use crate::jobs::repository as jobs;
use crate::models::cover_letter::{CoverLetterRow, CoverLetterTemplateRow};
use crate::state::AppState;

const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetterRequest {
    pub title: String,
    pub content: String,
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCoverLetterRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct TemplateRequest {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub content: Option<String>,
}

/// GET /api/v1/cover-letters
pub async fn handle_list_cover_letters(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<CoverLetterRow>>, AppError> {
    Ok(Json(repository::list(&state.db, user.id).await?))
}

/// POST /api/v1/cover-letters
pub async fn handle_create_cover_letter(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CoverLetterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CoverLetterRow>), AppError> {
    let Json(req) = payload?;
    let title = require_text("Title", &req.title, MAX_TITLE_CHARS)?;
    let content = require_text("Content", &req.content, MAX_CONTENT_CHARS)?;
    if let Some(job_id) = req.job_id {
        jobs::find_row(&state.db, user.id, job_id).await?;
    }

    let letter = repository::create(&state.db, user.id, req.job_id, &title, &content).await?;
    Ok((StatusCode::CREATED, Json(letter)))
}

/// GET /api/v1/cover-letters/:id
pub async fn handle_get_cover_letter(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CoverLetterRow>, AppError> {
    Ok(Json(repository::find(&state.db, user.id, id).await?))
}

/// PATCH /api/v1/cover-letters/:id
pub async fn handle_update_cover_letter(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateCoverLetterRequest>, JsonRejection>,
) -> Result<Json<CoverLetterRow>, AppError> {
    let Json(req) = payload?;
    let stored = repository::find(&state.db, user.id, id).await?;

    let title = match req.title {
        Some(title) => require_text("Title", &title, MAX_TITLE_CHARS)?,
        None => stored.title,
    };
    let content = match req.content {
        Some(content) => require_text("Content", &content, MAX_CONTENT_CHARS)?,
        None => stored.content,
    };
    let job_id = match req.job_id {
        Some(job_id) => {
            jobs::find_row(&state.db, user.id, job_id).await?;
            Some(job_id)
        }
        None => stored.job_id,
    };

    Ok(Json(
        repository::update(&state.db, user.id, id, job_id, &title, &content).await?,
    ))
}

/// DELETE /api/v1/cover-letters/:id
pub async fn handle_delete_cover_letter(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    repository::delete(&state.db, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/cover-letter-templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<CoverLetterTemplateRow>>, AppError> {
    Ok(Json(repository::list_templates(&state.db, user.id).await?))
}

/// POST /api/v1/cover-letter-templates
pub async fn handle_create_template(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<TemplateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CoverLetterTemplateRow>), AppError> {
    let Json(req) = payload?;
    let name = require_text("Name", &req.name, MAX_TITLE_CHARS)?;
    let content = require_text("Content", &req.content, MAX_CONTENT_CHARS)?;
    let template = repository::create_template(&state.db, user.id, &name, &content).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// PATCH /api/v1/cover-letter-templates/:id
pub async fn handle_update_template(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateTemplateRequest>, JsonRejection>,
) -> Result<Json<CoverLetterTemplateRow>, AppError> {
    let Json(req) = payload?;
    let stored = repository::find_template(&state.db, user.id, id).await?;

    let name = match req.name {
        Some(name) => require_text("Name", &name, MAX_TITLE_CHARS)?,
        None => stored.name,
    };
    let content = match req.content {
        Some(content) => require_text("Content", &content, MAX_CONTENT_CHARS)?,
        None => stored.content,
    };

    Ok(Json(
        repository::update_template(&state.db, user.id, id, &name, &content).await?,
    ))
}

/// DELETE /api/v1/cover-letter-templates/:id
pub async fn handle_delete_template(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    repository::delete_template(&state.db, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
