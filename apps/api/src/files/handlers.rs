use std::collections::HashMap;

use axum::{
    extract::{rejection::QueryRejection, Multipart, Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::files::{
    attachment_disposition, ensure_size, is_allowed, repository, resolve_type,
    sanitize_file_name, IMAGE_TYPES, MAX_LOGO_BYTES, RESUME_TYPES,
};
use crate::state::AppState;

const LOGO_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQuery {
    pub file_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoResponse {
    pub company_id: Uuid,
    pub logo_file_id: Uuid,
}

/// One file part of a multipart upload plus its sibling text fields.
#[derive(Debug)]
pub struct MultipartUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub fields: HashMap<String, String>,
}

/// Reads the `file` part and any text parts. Stops reading the file as soon
/// as it grows past `max_bytes`.
pub async fn read_multipart(
    mut multipart: Multipart,
    max_bytes: usize,
    what: &str,
) -> Result<MultipartUpload, AppError> {
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;
    let mut fields = HashMap::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = sanitize_file_name(field.file_name().unwrap_or("upload"));
            let content_type = field.content_type().map(str::to_string);
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
            {
                bytes.extend_from_slice(&chunk);
                if bytes.len() > max_bytes {
                    break;
                }
            }
            ensure_size(bytes.len(), max_bytes, what)?;
            file = Some((file_name, content_type, bytes));
        } else if !name.is_empty() {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?;
            fields.insert(name, text);
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("A file is required".to_string()))?;
    Ok(MultipartUpload {
        file_name,
        content_type,
        bytes,
        fields,
    })
}

fn parse_file_id(query: Result<Query<FileQuery>, QueryRejection>) -> Result<Uuid, AppError> {
    let Query(query) =
        query.map_err(|_| AppError::Validation("A fileId query parameter is required".to_string()))?;
    Uuid::parse_str(query.file_id.trim())
        .map_err(|_| AppError::Validation("Invalid file id".to_string()))
}

/// GET /api/v1/files/resume?fileId=
pub async fn handle_download_resume(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let file_id = parse_file_id(query)?;
    let file = repository::find_resume_file(&state.db, user.id, file_id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    if !is_allowed(RESUME_TYPES, &file.file_type) {
        warn!("Refusing to serve resume file {} of type {}", file.id, file.file_type);
        return Err(AppError::NotFound("File not found".to_string()));
    }

    Ok((
        [
            (header::CONTENT_TYPE, file.file_type.clone()),
            (header::CONTENT_DISPOSITION, attachment_disposition(&file.file_name)),
            (header::CACHE_CONTROL, "private, no-store".to_string()),
        ],
        file.content,
    ))
}

/// GET /api/v1/files/logo?fileId=
pub async fn handle_get_logo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let file_id = parse_file_id(query)?;
    let file = repository::find_logo_file(&state.db, user.id, file_id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    if !is_allowed(IMAGE_TYPES, &file.file_type) {
        warn!("Refusing to serve logo file {} of type {}", file.id, file.file_type);
        return Err(AppError::NotFound("File not found".to_string()));
    }

    Ok((
        [
            (header::CONTENT_TYPE, file.file_type.clone()),
            (header::CACHE_CONTROL, LOGO_CACHE_CONTROL.to_string()),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        file.content,
    ))
}

/// POST /api/v1/companies/:id/logo
pub async fn handle_upload_logo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(company_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<LogoResponse>, AppError> {
    let upload = read_multipart(multipart, MAX_LOGO_BYTES, "logo").await?;
    let file_type = resolve_type(IMAGE_TYPES, &upload.file_name, upload.content_type.as_deref())
        .ok_or_else(|| {
            AppError::Validation("Logos must be PNG, JPEG, WebP, SVG, or GIF images".to_string())
        })?;

    let logo_file_id = repository::replace_company_logo(
        &state.db,
        user.id,
        company_id,
        &upload.file_name,
        file_type,
        &upload.bytes,
    )
    .await?;
    info!("User {} set logo {logo_file_id} on company {company_id}", user.id);

    Ok(Json(LogoResponse {
        company_id,
        logo_file_id,
    }))
}
