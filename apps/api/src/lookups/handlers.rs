//! Handlers shared by the company, job-title, and location routes.
//!
//! Each route set is built by [`lookup_router`] with its [`LookupKind`]
//! captured, so one handler body serves all three lists.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::lookups::{repository, validate_label, LookupKind};
use crate::models::job::LookupRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub label: String,
}

async fn list(
    kind: LookupKind,
    state: AppState,
    user: AuthUser,
) -> Result<Json<Vec<LookupRow>>, AppError> {
    Ok(Json(repository::list(&state.db, kind, user.0.id).await?))
}

async fn create(
    kind: LookupKind,
    state: AppState,
    user: AuthUser,
    payload: Result<Json<LookupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LookupRow>), AppError> {
    let Json(req) = payload?;
    let label = validate_label(kind, &req.label)?;
    let row = repository::create(&state.db, kind, user.0.id, &label).await?;
    info!("User {} created {} {}", user.0.id, kind.noun(), row.id);
    Ok((StatusCode::CREATED, Json(row)))
}

async fn rename(
    kind: LookupKind,
    state: AppState,
    user: AuthUser,
    id: Uuid,
    payload: Result<Json<LookupRequest>, JsonRejection>,
) -> Result<Json<LookupRow>, AppError> {
    let Json(req) = payload?;
    let label = validate_label(kind, &req.label)?;
    Ok(Json(
        repository::rename(&state.db, kind, user.0.id, id, &label).await?,
    ))
}

async fn delete(
    kind: LookupKind,
    state: AppState,
    user: AuthUser,
    id: Uuid,
) -> Result<StatusCode, AppError> {
    repository::delete(&state.db, kind, user.0.id, id).await?;
    info!("User {} deleted {} {id}", user.0.id, kind.noun());
    Ok(StatusCode::NO_CONTENT)
}

/// `GET/POST /` and `PATCH/DELETE /:id` for one lookup kind.
pub fn lookup_router(kind: LookupKind) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |State(state): State<AppState>, user: AuthUser| list(kind, state, user)).post(
                move |State(state): State<AppState>,
                      user: AuthUser,
                      payload: Result<Json<LookupRequest>, JsonRejection>| {
                    create(kind, state, user, payload)
                },
            ),
        )
        .route(
            "/:id",
            patch(
                move |State(state): State<AppState>,
                      user: AuthUser,
                      Path(id): Path<Uuid>,
                      payload: Result<Json<LookupRequest>, JsonRejection>| {
                    rename(kind, state, user, id, payload)
                },
            )
            .delete(
                move |State(state): State<AppState>, user: AuthUser, Path(id): Path<Uuid>| {
                    delete(kind, state, user, id)
                },
            ),
        )
}
