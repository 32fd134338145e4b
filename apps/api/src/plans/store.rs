//! Usage count sources.
//!
//! `UsageStore` reads counts that already live in Postgres. `AiUsageCounter`
//! is a monthly per-user counter of accepted AI calls kept in Redis.
//! Both are carried in `AppState` as trait objects.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use redis::AsyncCommands;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::plans::limits::UNLIMITED;

#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Jobs owned by the user with `applied = true`.
    async fn applied_job_count(&self, user_id: Uuid) -> Result<i64, AppError>;

    /// Resumes under the user's profile.
    async fn resume_count(&self, user_id: Uuid) -> Result<i64, AppError>;

    /// Total bytes of files referenced by the user's resumes. Null sizes count as 0.
    async fn storage_bytes(&self, user_id: Uuid) -> Result<i64, AppError>;
}

#[async_trait]
pub trait AiUsageCounter: Send + Sync {
    /// Requests consumed in `period`.
    async fn current(&self, user_id: Uuid, period: &str) -> Result<i64, AppError>;

    /// Atomically consumes one request when below `limit`.
    /// Returns the new count, or `None` when the limit is already reached.
    async fn try_consume(
        &self,
        user_id: Uuid,
        period: &str,
        limit: i64,
    ) -> Result<Option<i64>, AppError>;

    /// Gives back one request consumed in `period`.
    async fn release(&self, user_id: Uuid, period: &str) -> Result<(), AppError>;
}

/// Calendar-month bucket (UTC) used to key AI usage, e.g. `2026-10`.
pub fn month_period(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

/// Unix timestamp one day after the end of `now`'s month; counters expire then.
pub fn period_expiry(now: DateTime<Utc>) -> i64 {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 2)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_else(|| now.timestamp() + 32 * 86_400)
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

pub struct PgUsageStore {
    pool: PgPool,
}

impl PgUsageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageStore for PgUsageStore {
    async fn applied_job_count(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE user_id = $1 AND applied = TRUE")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn resume_count(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM resumes r
            JOIN profiles p ON p.id = r.profile_id
            WHERE p.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn storage_bytes(&self, user_id: Uuid) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(COALESCE(f.file_size, 0)), 0)::BIGINT
            FROM files f
            JOIN resumes r ON r.file_id = f.id
            JOIN profiles p ON p.id = r.profile_id
            WHERE p.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis
// ────────────────────────────────────────────────────────────────────────────

pub struct RedisAiUsageCounter {
    client: redis::Client,
}

impl RedisAiUsageCounter {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn key(user_id: Uuid, period: &str) -> String {
        format!("ai_usage:{user_id}:{period}")
    }
}

#[async_trait]
impl AiUsageCounter for RedisAiUsageCounter {
    async fn current(&self, user_id: Uuid, period: &str) -> Result<i64, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let count: Option<i64> = conn.get(Self::key(user_id, period)).await?;
        Ok(count.unwrap_or(0))
    }

    async fn try_consume(
        &self,
        user_id: Uuid,
        period: &str,
        limit: i64,
    ) -> Result<Option<i64>, AppError> {
        let key = Self::key(user_id, period);
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // INCR first so concurrent callers each observe a distinct count;
        // whoever lands above the limit hands its increment back.
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .cmd("EXPIREAT")
            .arg(&key)
            .arg(period_expiry(Utc::now()))
            .ignore()
            .query_async(&mut conn)
            .await?;

        if limit != UNLIMITED && count > limit {
            let _: i64 = conn.decr(&key, 1).await?;
            return Ok(None);
        }

        Ok(Some(count))
    }

    async fn release(&self, user_id: Uuid, period: &str) -> Result<(), AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: i64 = conn.decr(Self::key(user_id, period), 1).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_period_format() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(month_period(now), "2026-03");
    }

    #[test]
    fn test_period_expiry_is_after_month_end() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0).unwrap();
        let expected = Utc.with_ymd_and_hms(2026, 11, 2, 0, 0, 0).unwrap();
        assert_eq!(period_expiry(now), expected.timestamp());
    }

    #[test]
    fn test_period_expiry_rolls_over_year() {
        let now = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        let expected = Utc.with_ymd_and_hms(2027, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(period_expiry(now), expected.timestamp());
    }
}
