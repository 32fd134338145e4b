use axum::{extract::State, Json};
use chrono::Utc;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::plans::enforcement::{usage_summary, UsageSummary};
use crate::state::AppState;

/// GET /api/v1/usage
pub async fn handle_usage(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UsageSummary>, AppError> {
    Ok(Json(
        usage_summary(
            state.usage.as_ref(),
            state.ai_usage.as_ref(),
            user.id,
            user.plan(),
            Utc::now(),
        )
        .await?,
    ))
}
