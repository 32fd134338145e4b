use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::files::repository::{delete_file, insert_file};
use crate::models::resume::{FileMeta, ResumeRow, ResumeSummary, WorkExperienceRow};

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Resume {id} not found"))
}

/// The user's profile id, creating the profile on first use.
pub async fn ensure_profile(conn: &mut PgConnection, user_id: Uuid) -> Result<Uuid, AppError> {
    Ok(sqlx::query_scalar(
        r#"
        INSERT INTO profiles (id, user_id) VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .fetch_one(conn)
    .await?)
}

pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<ResumeSummary>, AppError> {
    Ok(sqlx::query_as::<_, ResumeSummary>(
        r#"
        SELECT r.id, r.title, r.summary, r.file_id, f.file_name, f.file_size,
               r.created_at, r.updated_at
        FROM resumes r
        JOIN profiles p ON p.id = r.profile_id
        LEFT JOIN files f ON f.id = r.file_id
        WHERE p.user_id = $1
        ORDER BY r.updated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn find(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<ResumeRow, AppError> {
    sqlx::query_as::<_, ResumeRow>(
        r#"
        SELECT r.*
        FROM resumes r
        JOIN profiles p ON p.id = r.profile_id
        WHERE r.id = $1 AND p.user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

pub async fn file_meta(pool: &PgPool, file_id: Uuid) -> Result<Option<FileMeta>, AppError> {
    Ok(sqlx::query_as::<_, FileMeta>(
        "SELECT id, file_name, file_type, file_size, created_at FROM files WHERE id = $1",
    )
    .bind(file_id)
    .fetch_optional(pool)
    .await?)
}

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
    summary: Option<&str>,
) -> Result<ResumeRow, AppError> {
    let mut tx = pool.begin().await?;
    let profile_id = ensure_profile(&mut tx, user_id).await?;
    let resume = sqlx::query_as::<_, ResumeRow>(
        r#"
        INSERT INTO resumes (id, profile_id, title, summary)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(profile_id)
    .bind(title)
    .bind(summary)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(resume)
}

/// Stores the document and the resume that references it in one transaction.
pub async fn create_with_file(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
    file_name: &str,
    file_type: &str,
    content: &[u8],
) -> Result<ResumeRow, AppError> {
    let mut tx = pool.begin().await?;
    let profile_id = ensure_profile(&mut tx, user_id).await?;
    let file_id = insert_file(&mut tx, file_name, file_type, content).await?;
    let resume = sqlx::query_as::<_, ResumeRow>(
        r#"
        INSERT INTO resumes (id, profile_id, title, file_id)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(profile_id)
    .bind(title)
    .bind(file_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(resume)
}

pub async fn update(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    title: &str,
    summary: Option<&str>,
) -> Result<ResumeRow, AppError> {
    sqlx::query_as::<_, ResumeRow>(
        r#"
        UPDATE resumes r
        SET title = $1, summary = $2, updated_at = NOW()
        FROM profiles p
        WHERE r.id = $3 AND p.id = r.profile_id AND p.user_id = $4
        RETURNING r.*
        "#,
    )
    .bind(title)
    .bind(summary)
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found(id))
}

/// Deletes the resume and its stored document.
pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let deleted: Option<Option<Uuid>> = sqlx::query_scalar(
        r#"
        DELETE FROM resumes r
        USING profiles p
        WHERE r.id = $1 AND p.id = r.profile_id AND p.user_id = $2
        RETURNING r.file_id
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(file_id) = deleted else {
        return Err(not_found(id));
    };
    if let Some(file_id) = file_id {
        delete_file(&mut tx, file_id).await?;
    }
    tx.commit().await?;
    Ok(())
}

const WORK_EXPERIENCE_SELECT: &str = r#"
    SELECT w.id, w.resume_id,
           w.company_id, c.label AS company,
           w.job_title_id, t.label AS job_title,
           w.location_id, l.label AS location,
           w.start_date, w.end_date, w.description
    FROM work_experiences w
    JOIN companies c ON c.id = w.company_id
    JOIN job_titles t ON t.id = w.job_title_id
    LEFT JOIN locations l ON l.id = w.location_id
"#;

/// Most recent first. Caller must have checked resume ownership.
pub async fn work_experiences(
    pool: &PgPool,
    resume_id: Uuid,
) -> Result<Vec<WorkExperienceRow>, AppError> {
    let sql = format!(
        "{WORK_EXPERIENCE_SELECT} WHERE w.resume_id = $1 ORDER BY w.start_date DESC"
    );
    Ok(sqlx::query_as::<_, WorkExperienceRow>(&sql)
        .bind(resume_id)
        .fetch_all(pool)
        .await?)
}

#[derive(Debug, Clone)]
pub struct NewWorkExperience {
    pub company_id: Uuid,
    pub job_title_id: Uuid,
    pub location_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub description: String,
}

pub async fn add_work_experience(
    pool: &PgPool,
    resume_id: Uuid,
    entry: &NewWorkExperience,
) -> Result<WorkExperienceRow, AppError> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO work_experiences
            (id, resume_id, company_id, job_title_id, location_id, start_date, end_date, description)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(resume_id)
    .bind(entry.company_id)
    .bind(entry.job_title_id)
    .bind(entry.location_id)
    .bind(entry.start_date)
    .bind(entry.end_date)
    .bind(&entry.description)
    .execute(pool)
    .await?;

    sqlx::query("UPDATE resumes SET updated_at = NOW() WHERE id = $1")
        .bind(resume_id)
        .execute(pool)
        .await?;

    let sql = format!("{WORK_EXPERIENCE_SELECT} WHERE w.id = $1");
    Ok(sqlx::query_as::<_, WorkExperienceRow>(&sql)
        .bind(id)
        .fetch_one(pool)
        .await?)
}

pub async fn delete_work_experience(
    pool: &PgPool,
    user_id: Uuid,
    resume_id: Uuid,
    id: Uuid,
) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        DELETE FROM work_experiences w
        USING resumes r, profiles p
        WHERE w.id = $1 AND w.resume_id = $2
          AND r.id = w.resume_id AND p.id = r.profile_id AND p.user_id = $3
        "#,
    )
    .bind(id)
    .bind(resume_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Work experience {id} not found")));
    }
    Ok(())
}
