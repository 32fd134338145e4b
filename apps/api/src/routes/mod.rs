pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};

use crate::ai::handlers as ai;
use crate::auth::handlers as auth;
use crate::billing::handlers as billing;
use crate::cover_letters::handlers as cover_letters;
use crate::files::handlers as files;
use crate::files::MAX_RESUME_BYTES;
use crate::jobs::{dashboard, handlers as jobs};
use crate::lookups::handlers::lookup_router;
use crate::lookups::LookupKind;
use crate::plans::handlers as plans;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

/// Request body ceiling for multipart uploads: the largest file plus form overhead.
pub const UPLOAD_BODY_LIMIT: usize = MAX_RESUME_BYTES + 512 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/v1/auth/signup", post(auth::handle_signup))
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/logout", post(auth::handle_logout))
        .route("/api/v1/auth/me", get(auth::handle_me))
        .route(
            "/api/v1/auth/forgot-password",
            post(auth::handle_forgot_password),
        )
        .route(
            "/api/v1/auth/reset-password",
            post(auth::handle_reset_password),
        )
        // Billing
        .route("/api/v1/billing/checkout", post(billing::handle_checkout))
        .route("/api/v1/billing/portal", post(billing::handle_portal))
        .route(
            "/api/v1/webhooks/stripe",
            post(billing::handle_stripe_webhook),
        )
        .route("/api/v1/usage", get(plans::handle_usage))
        // Lookups
        .nest(
            "/api/v1/companies",
            lookup_router(LookupKind::Company).route(
                "/:id/logo",
                post(files::handle_upload_logo).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
            ),
        )
        .nest("/api/v1/job-titles", lookup_router(LookupKind::JobTitle))
        .nest("/api/v1/locations", lookup_router(LookupKind::Location))
        .route("/api/v1/job-statuses", get(jobs::handle_list_statuses))
        .route("/api/v1/job-sources", get(jobs::handle_list_sources))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job)
                .patch(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .route("/api/v1/dashboard", get(dashboard::handle_dashboard))
        // Resumes
        .route(
            "/api/v1/resumes",
            get(resumes::handle_list_resumes).post(resumes::handle_create_resume),
        )
        .route(
            "/api/v1/resumes/upload",
            post(resumes::handle_upload_resume).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/api/v1/resumes/:id",
            get(resumes::handle_get_resume)
                .patch(resumes::handle_update_resume)
                .delete(resumes::handle_delete_resume),
        )
        .route(
            "/api/v1/resumes/:id/work-experiences",
            post(resumes::handle_add_work_experience),
        )
        .route(
            "/api/v1/resumes/:id/work-experiences/:we_id",
            delete(resumes::handle_delete_work_experience),
        )
        // Files
        .route("/api/v1/files/resume", get(files::handle_download_resume))
        .route("/api/v1/files/logo", get(files::handle_get_logo))
        // Cover letters
        .route(
            "/api/v1/cover-letters",
            get(cover_letters::handle_list_cover_letters)
                .post(cover_letters::handle_create_cover_letter),
        )
        .route(
            "/api/v1/cover-letters/:id",
            get(cover_letters::handle_get_cover_letter)
                .patch(cover_letters::handle_update_cover_letter)
                .delete(cover_letters::handle_delete_cover_letter),
        )
        .route(
            "/api/v1/cover-letter-templates",
            get(cover_letters::handle_list_templates).post(cover_letters::handle_create_template),
        )
        .route(
            "/api/v1/cover-letter-templates/:id",
            patch(cover_letters::handle_update_template)
                .delete(cover_letters::handle_delete_template),
        )
        // AI
        .route("/api/v1/ai/resume-review", post(ai::handle_resume_review))
        .route("/api/v1/ai/job-match", post(ai::handle_job_match))
        .route("/api/v1/ai/cover-letter", post(ai::handle_cover_letter))
        .with_state(state)
}
