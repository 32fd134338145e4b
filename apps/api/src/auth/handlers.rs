//! Axum route handlers for the Auth API.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::extractor::AuthUser;
use crate::auth::reset::{self, RESET_REQUESTED_MESSAGE};
use crate::auth::store::{NewUser, DUPLICATE_EMAIL_MESSAGE};
use crate::auth::validation::{normalize_email, validate_signup};
use crate::errors::AppError;
use crate::models::user::{User, UserResponse};
use crate::state::AppState;

const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

fn session_response(
    state: &AppState,
    status: StatusCode,
    user: &User,
) -> Result<impl IntoResponse, AppError> {
    let token = state.sessions.issue(user.id)?;
    let cookie = state.sessions.cookie(&token);
    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user: UserResponse::from(user),
            token,
        }),
    ))
}

/// POST /api/v1/auth/signup
pub async fn handle_signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let input = validate_signup(&req.name, &req.email, &req.password)?;

    if state.users.find_by_email(&input.email).await?.is_some() {
        return Err(AppError::Conflict(DUPLICATE_EMAIL_MESSAGE.to_string()));
    }

    let password_hash = state.hasher.hash(&req.password).await?;
    let user = state
        .users
        .create(NewUser {
            name: input.name,
            email: input.email,
            password_hash,
        })
        .await?;

    info!("User {} signed up", user.id);
    session_response(&state, StatusCode::CREATED, &user)
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let email = normalize_email(&req.email);

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string()))?;

    if !state.hasher.verify(&req.password, &user.password_hash).await? {
        return Err(AppError::Unauthorized(
            INVALID_CREDENTIALS_MESSAGE.to_string(),
        ));
    }

    info!("User {} logged in", user.id);
    session_response(&state, StatusCode::OK, &user)
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
    )
}

/// GET /api/v1/auth/me
pub async fn handle_me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

/// POST /api/v1/auth/forgot-password
///
/// Always answers with the same message so the response does not reveal
/// whether an account exists.
pub async fn handle_forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(req) = payload?;
    reset::request_password_reset(
        state.users.as_ref(),
        state.mailer.as_ref(),
        &state.config.app_url,
        &req.email,
        Utc::now(),
    )
    .await?;

    Ok(Json(json!({ "message": RESET_REQUESTED_MESSAGE })))
}

/// POST /api/v1/auth/reset-password
pub async fn handle_reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(req) = payload?;
    reset::reset_password(
        state.users.as_ref(),
        &state.hasher,
        &req.token,
        &req.password,
        Utc::now(),
    )
    .await?;

    Ok(Json(json!({ "message": "Your password has been reset. You can now log in." })))
}
