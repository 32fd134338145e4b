//! Dashboard rollup: jobs per status, recent application pace, latest jobs,
//! and plan usage.

use axum::{extract::State, Json};
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::jobs::repository;
use crate::models::job::JobDetail;
use crate::plans::enforcement::{usage_summary, UsageSummary};
use crate::state::AppState;

const RECENT_JOBS: i64 = 5;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StatusCount {
    pub value: String,
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_jobs: i64,
    pub status_counts: Vec<StatusCount>,
    pub applied_this_week: i64,
    pub applied_this_month: i64,
    pub recent_jobs: Vec<JobDetail>,
    pub usage: UsageSummary,
}

/// Start of the ISO week (Monday 00:00 UTC) and of the month containing `now`.
pub fn period_starts(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    let first = today.with_day(1).unwrap_or(today);
    (
        monday.and_time(NaiveTime::MIN).and_utc(),
        first.and_time(NaiveTime::MIN).and_utc(),
    )
}

/// Every status with the user's job count, zero included.
async fn status_counts(pool: &PgPool, user_id: Uuid) -> Result<Vec<StatusCount>, AppError> {
    Ok(sqlx::query_as::<_, StatusCount>(
        r#"
        SELECT s.value, s.label, COUNT(j.id) AS count
        FROM job_statuses s
        LEFT JOIN jobs j ON j.status_id = s.id AND j.user_id = $1
        GROUP BY s.id, s.value, s.label
        ORDER BY s.label ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

async fn applied_since(pool: &PgPool, user_id: Uuid, since: DateTime<Utc>) -> Result<i64, AppError> {
    Ok(sqlx::query_scalar(
        "SELECT COUNT(*) FROM jobs WHERE user_id = $1 AND applied = TRUE AND applied_date >= $2",
    )
    .bind(user_id)
    .bind(since)
    .fetch_one(pool)
    .await?)
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<DashboardResponse>, AppError> {
    let now = Utc::now();
    let (week_start, month_start) = period_starts(now);

    let status_counts = status_counts(&state.db, user.id).await?;
    let total_jobs = status_counts.iter().map(|s| s.count).sum();

    Ok(Json(DashboardResponse {
        total_jobs,
        status_counts,
        applied_this_week: applied_since(&state.db, user.id, week_start).await?,
        applied_this_month: applied_since(&state.db, user.id, month_start).await?,
        recent_jobs: repository::recent(&state.db, user.id, RECENT_JOBS).await?,
        usage: usage_summary(
            state.usage.as_ref(),
            state.ai_usage.as_ref(),
            user.id,
            user.plan(),
            now,
        )
        .await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_period_starts_midweek() {
        // Thursday
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 17, 30, 0).unwrap();
        let (week, month) = period_starts(now);
        assert_eq!(week, Utc.with_ymd_and_hms(2026, 10, 12, 0, 0, 0).unwrap());
        assert_eq!(month, Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_week_can_start_in_previous_month() {
        // Friday 1 May 2026
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let (week, month) = period_starts(now);
        assert_eq!(week, Utc.with_ymd_and_hms(2026, 4, 27, 0, 0, 0).unwrap());
        assert_eq!(month, Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap());
    }
}
