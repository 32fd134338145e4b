use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::cover_letter::{CoverLetterRow, CoverLetterTemplateRow};

pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<CoverLetterRow>, AppError> {
    Ok(sqlx::query_as::<_, CoverLetterRow>(
        "SELECT * FROM cover_letters WHERE user_id = $1 ORDER BY updated_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn find(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<CoverLetterRow, AppError> {
    sqlx::query_as::<_, CoverLetterRow>(
        "SELECT * FROM cover_letters WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Cover letter {id} not found")))
}

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    job_id: Option<Uuid>,
    title: &str,
    content: &str,
) -> Result<CoverLetterRow, AppError> {
    Ok(sqlx::query_as::<_, CoverLetterRow>(
        r#"
        INSERT INTO cover_letters (id, user_id, job_id, title, content)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(job_id)
    .bind(title)
    .bind(content)
    .fetch_one(pool)
    .await?)
}

pub async fn update(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    job_id: Option<Uuid>,
    title: &str,
    content: &str,
) -> Result<CoverLetterRow, AppError> {
    sqlx::query_as::<_, CoverLetterRow>(
        r#"
        UPDATE cover_letters
        SET job_id = $1, title = $2, content = $3, updated_at = NOW()
        WHERE id = $4 AND user_id = $5
        RETURNING *
        "#,
    )
    .bind(job_id)
    .bind(title)
    .bind(content)
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Cover letter {id} not found")))
}

pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM cover_letters WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Cover letter {id} not found")));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Templates
// ────────────────────────────────────────────────────────────────────────────

pub async fn list_templates(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<CoverLetterTemplateRow>, AppError> {
    Ok(sqlx::query_as::<_, CoverLetterTemplateRow>(
        "SELECT * FROM cover_letter_templates WHERE user_id = $1 ORDER BY name ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn find_template(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<CoverLetterTemplateRow, AppError> {
    sqlx::query_as::<_, CoverLetterTemplateRow>(
        "SELECT * FROM cover_letter_templates WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Template {id} not found")))
}

pub async fn create_template(
    pool: &PgPool,
    user_id: Uuid,
    name: &str,
    content: &str,
) -> Result<CoverLetterTemplateRow, AppError> {
    Ok(sqlx::query_as::<_, CoverLetterTemplateRow>(
        r#"
        INSERT INTO cover_letter_templates (id, user_id, name, content)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(name)
    .bind(content)
    .fetch_one(pool)
    .await?)
}

pub async fn update_template(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    name: &str,
    content: &str,
) -> Result<CoverLetterTemplateRow, AppError> {
    sqlx::query_as::<_, CoverLetterTemplateRow>(
        r#"
        UPDATE cover_letter_templates
        SET name = $1, content = $2, updated_at = NOW()
        WHERE id = $3 AND user_id = $4
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(content)
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Template {id} not found")))
}

pub async fn delete_template(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM cover_letter_templates WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Template {id} not found")));
    }
    Ok(())
}
