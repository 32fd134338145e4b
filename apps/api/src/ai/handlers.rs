//! Axum route handlers for the AI API.

use std::convert::Infallible;
use std::pin::Pin;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Utc;
use futures::Stream;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ai::context::{load_resume_text, render_job};
use crate::ai::prompts::{
    system_prompt, template_section, COVER_LETTER_SYSTEM, COVER_LETTER_TEMPLATE,
    JOB_MATCH_SYSTEM, JOB_MATCH_TEMPLATE, RESUME_REVIEW_SYSTEM, RESUME_REVIEW_TEMPLATE,
};
use crate::ai::stream::sse_events;
use crate::auth::AuthUser;
use crate::cover_letters::repository as cover_letters;
use crate::errors::AppError;
use crate::jobs::repository as jobs;
use crate::llm_client::{resolve_model, SUPPORTED_MODELS};
use crate::models::user::User;
use crate::plans::enforcement::{consume_ai_request, release_ai_request};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeReviewRequest {
    pub resume_id: Uuid,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMatchRequest {
    pub resume_id: Uuid,
    pub job_id: Uuid,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetterRequest {
    pub resume_id: Uuid,
    pub job_id: Uuid,
    pub model: Option<String>,
    pub template_id: Option<Uuid>,
}

type BoxedEvents = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;
type EventStream = Sse<BoxedEvents>;

fn model_for(requested: Option<&str>) -> Result<&'static str, AppError> {
    resolve_model(requested).ok_or_else(|| {
        AppError::Validation(format!(
            "Unsupported model. Choose one of: {}",
            SUPPORTED_MODELS.join(", ")
        ))
    })
}

/// Consumes one AI request, opens the provider stream, and wraps it as SSE.
/// The request is handed back if the provider call fails before streaming.
async fn start_stream(
    state: &AppState,
    user: &User,
    feature: &str,
    model: &'static str,
    system: &str,
    prompt: &str,
) -> Result<EventStream, AppError> {
    let grant = consume_ai_request(state.ai_usage.as_ref(), user.id, user.plan(), Utc::now()).await?;

    match state.llm.stream_text(model, system, prompt).await {
        Ok(upstream) => {
            info!(
                "User {} started {feature} on {model} (request {} this month)",
                user.id, grant.used
            );
            let events: BoxedEvents = Box::pin(sse_events(upstream));
            Ok(Sse::new(events).keep_alive(KeepAlive::default()))
        }
        Err(e) => {
            if let Err(release_err) = release_ai_request(state.ai_usage.as_ref(), user.id, &grant).await {
                warn!("Failed to release AI request for user {}: {release_err}", user.id);
            }
            Err(AppError::Llm(e))
        }
    }
}

/// POST /api/v1/ai/resume-review
pub async fn handle_resume_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<ResumeReviewRequest>, JsonRejection>,
) -> Result<EventStream, AppError> {
    let Json(req) = payload?;
    let model = model_for(req.model.as_deref())?;

    let resume = load_resume_text(&state.db, user.id, req.resume_id).await?;
    let prompt = RESUME_REVIEW_TEMPLATE.replace("{resume}", &resume);

    start_stream(
        &state,
        &user,
        "resume review",
        model,
        &system_prompt(RESUME_REVIEW_SYSTEM, true),
        &prompt,
    )
    .await
}

/// POST /api/v1/ai/job-match
pub async fn handle_job_match(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<JobMatchRequest>, JsonRejection>,
) -> Result<EventStream, AppError> {
    let Json(req) = payload?;
    let model = model_for(req.model.as_deref())?;

    let job = jobs::find_detail(&state.db, user.id, req.job_id).await?;
    let resume = load_resume_text(&state.db, user.id, req.resume_id).await?;
    let prompt = JOB_MATCH_TEMPLATE
        .replace("{job}", &render_job(&job))
        .replace("{resume}", &resume);

    start_stream(
        &state,
        &user,
        "job match",
        model,
        &system_prompt(JOB_MATCH_SYSTEM, true),
        &prompt,
    )
    .await
}

/// POST /api/v1/ai/cover-letter
pub async fn handle_cover_letter(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CoverLetterRequest>, JsonRejection>,
) -> Result<EventStream, AppError> {
    let Json(req) = payload?;
    let model = model_for(req.model.as_deref())?;

    let job = jobs::find_detail(&state.db, user.id, req.job_id).await?;
    let resume = load_resume_text(&state.db, user.id, req.resume_id).await?;
    let template = match req.template_id {
        Some(id) => Some(cover_letters::find_template(&state.db, user.id, id).await?.content),
        None => None,
    };
    let prompt = COVER_LETTER_TEMPLATE
        .replace("{template}", &template_section(template.as_deref()))
        .replace("{job}", &render_job(&job))
        .replace("{resume}", &resume);

    start_stream(
        &state,
        &user,
        "cover letter",
        model,
        &system_prompt(COVER_LETTER_SYSTEM, false),
        &prompt,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_for_rejects_unknown() {
        assert!(matches!(model_for(Some("gpt-4o")), Err(AppError::Validation(_))));
        assert_eq!(model_for(None).unwrap(), SUPPORTED_MODELS[0]);
    }
}
