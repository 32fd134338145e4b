use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::{JobListQuery, Page};
use crate::models::job::{JobDetail, JobRow, ReferenceRow};

const JOB_DETAIL_SELECT: &str = r#"
    SELECT
        j.id,
        j.job_title_id, t.label AS job_title,
        j.company_id, c.label AS company, c.logo_file_id AS company_logo_file_id,
        j.location_id, l.label AS location,
        j.status_id, s.label AS status,
        j.source_id, src.label AS source,
        j.job_type, j.description, j.job_url, j.salary_range,
        j.applied, j.applied_date, j.due_date,
        j.created_at, j.updated_at
    FROM jobs j
    JOIN job_titles t ON t.id = j.job_title_id
    JOIN companies c ON c.id = j.company_id
    JOIN locations l ON l.id = j.location_id
    JOIN job_statuses s ON s.id = j.status_id
    LEFT JOIN job_sources src ON src.id = j.source_id
"#;

// $1 user, $2 status value, $3 search pattern, $4 applied
const JOB_FILTERS: &str = r#"
    WHERE j.user_id = $1
      AND ($2::TEXT IS NULL OR s.value = $2)
      AND ($3::TEXT IS NULL
           OR t.label ILIKE $3
           OR c.label ILIKE $3
           OR j.description ILIKE $3)
      AND ($4::BOOLEAN IS NULL OR j.applied = $4)
"#;

/// Column values for an insert or a full update.
#[derive(Debug, Clone)]
pub struct JobFields {
    pub job_title_id: Uuid,
    pub company_id: Uuid,
    pub location_id: Uuid,
    pub status_id: Uuid,
    pub source_id: Option<Uuid>,
    pub job_type: String,
    pub description: String,
    pub job_url: Option<String>,
    pub salary_range: Option<String>,
    pub applied: bool,
    pub applied_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

/// `%term%` for ILIKE with the wildcard characters in `term` escaped.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub async fn statuses(pool: &PgPool) -> Result<Vec<ReferenceRow>, AppError> {
    Ok(sqlx::query_as::<_, ReferenceRow>(
        "SELECT id, value, label FROM job_statuses ORDER BY label ASC",
    )
    .fetch_all(pool)
    .await?)
}

pub async fn sources(pool: &PgPool) -> Result<Vec<ReferenceRow>, AppError> {
    Ok(sqlx::query_as::<_, ReferenceRow>(
        "SELECT id, value, label FROM job_sources ORDER BY label ASC",
    )
    .fetch_all(pool)
    .await?)
}

pub async fn ensure_status_exists(pool: &PgPool, status_id: Uuid) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM job_statuses WHERE id = $1)")
        .bind(status_id)
        .fetch_one(pool)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Unknown job status {status_id}")))
    }
}

pub async fn ensure_source_exists(pool: &PgPool, source_id: Uuid) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM job_sources WHERE id = $1)")
        .bind(source_id)
        .fetch_one(pool)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Unknown job source {source_id}")))
    }
}

/// One page of the user's jobs, newest first, and the total match count.
pub async fn list(
    pool: &PgPool,
    user_id: Uuid,
    query: &JobListQuery,
    page: Page,
) -> Result<(Vec<JobDetail>, i64), AppError> {
    let status = query
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern);

    let count_sql = format!(
        r#"
        SELECT COUNT(*)
        FROM jobs j
        JOIN job_titles t ON t.id = j.job_title_id
        JOIN companies c ON c.id = j.company_id
        JOIN job_statuses s ON s.id = j.status_id
        {JOB_FILTERS}
        "#
    );
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(user_id)
        .bind(status)
        .bind(search.as_deref())
        .bind(query.applied)
        .fetch_one(pool)
        .await?;

    let rows_sql = format!(
        "{JOB_DETAIL_SELECT} {JOB_FILTERS} ORDER BY j.created_at DESC LIMIT $5 OFFSET $6"
    );
    let jobs = sqlx::query_as::<_, JobDetail>(&rows_sql)
        .bind(user_id)
        .bind(status)
        .bind(search.as_deref())
        .bind(query.applied)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    Ok((jobs, total))
}

pub async fn recent(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<JobDetail>, AppError> {
    let sql = format!("{JOB_DETAIL_SELECT} WHERE j.user_id = $1 ORDER BY j.created_at DESC LIMIT $2");
    Ok(sqlx::query_as::<_, JobDetail>(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

pub async fn find_row(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<JobRow, AppError> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

pub async fn find_detail(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<JobDetail, AppError> {
    let sql = format!("{JOB_DETAIL_SELECT} WHERE j.id = $1 AND j.user_id = $2");
    sqlx::query_as::<_, JobDetail>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

pub async fn insert(pool: &PgPool, user_id: Uuid, fields: &JobFields) -> Result<Uuid, AppError> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO jobs
            (id, user_id, job_title_id, company_id, location_id, status_id, source_id,
             job_type, description, job_url, salary_range, applied, applied_date, due_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(fields.job_title_id)
    .bind(fields.company_id)
    .bind(fields.location_id)
    .bind(fields.status_id)
    .bind(fields.source_id)
    .bind(&fields.job_type)
    .bind(&fields.description)
    .bind(&fields.job_url)
    .bind(&fields.salary_range)
    .bind(fields.applied)
    .bind(fields.applied_date)
    .bind(fields.due_date)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn update(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    fields: &JobFields,
) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET job_title_id = $1, company_id = $2, location_id = $3, status_id = $4,
            source_id = $5, job_type = $6, description = $7, job_url = $8,
            salary_range = $9, applied = $10, applied_date = $11, due_date = $12,
            updated_at = NOW()
        WHERE id = $13 AND user_id = $14
        "#,
    )
    .bind(fields.job_title_id)
    .bind(fields.company_id)
    .bind(fields.location_id)
    .bind(fields.status_id)
    .bind(fields.source_id)
    .bind(&fields.job_type)
    .bind(&fields.description)
    .bind(&fields.job_url)
    .bind(&fields.salary_range)
    .bind(fields.applied)
    .bind(fields.applied_date)
    .bind(fields.due_date)
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Job {id} not found")));
    }
    Ok(())
}

pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Job {id} not found")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
