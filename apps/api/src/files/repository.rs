use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::StoredFile;

pub async fn insert_file(
    conn: &mut PgConnection,
    file_name: &str,
    file_type: &str,
    content: &[u8],
) -> Result<Uuid, AppError> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO files (id, file_name, file_type, file_size, content)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(file_name)
    .bind(file_type)
    .bind(content.len() as i64)
    .bind(content)
    .execute(conn)
    .await?;
    Ok(id)
}

pub async fn delete_file(conn: &mut PgConnection, file_id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM files WHERE id = $1")
        .bind(file_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// A resume file, only if it belongs to a resume under the user's profile.
pub async fn find_resume_file(
    pool: &PgPool,
    user_id: Uuid,
    file_id: Uuid,
) -> Result<Option<StoredFile>, AppError> {
    Ok(sqlx::query_as::<_, StoredFile>(
        r#"
        SELECT f.id, f.file_name, f.file_type, f.content
        FROM files f
        JOIN resumes r ON r.file_id = f.id
        JOIN profiles p ON p.id = r.profile_id
        WHERE f.id = $1 AND p.user_id = $2
        LIMIT 1
        "#,
    )
    .bind(file_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

/// A logo file, only if it is the logo of one of the user's companies.
pub async fn find_logo_file(
    pool: &PgPool,
    user_id: Uuid,
    file_id: Uuid,
) -> Result<Option<StoredFile>, AppError> {
    Ok(sqlx::query_as::<_, StoredFile>(
        r#"
        SELECT f.id, f.file_name, f.file_type, f.content
        FROM files f
        JOIN companies c ON c.logo_file_id = f.id
        WHERE f.id = $1 AND c.user_id = $2
        LIMIT 1
        "#,
    )
    .bind(file_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

/// Points the company at a new logo and removes the old one. Returns the
/// new file id.
pub async fn replace_company_logo(
    pool: &PgPool,
    user_id: Uuid,
    company_id: Uuid,
    file_name: &str,
    file_type: &str,
    content: &[u8],
) -> Result<Uuid, AppError> {
    let mut tx = pool.begin().await?;

    let previous: Option<Option<Uuid>> = sqlx::query_scalar(
        "SELECT logo_file_id FROM companies WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(company_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(previous) = previous else {
        return Err(AppError::NotFound(format!("No company with id {company_id}")));
    };

    let file_id = insert_file(&mut tx, file_name, file_type, content).await?;
    sqlx::query("UPDATE companies SET logo_file_id = $1, updated_at = NOW() WHERE id = $2")
        .bind(file_id)
        .bind(company_id)
        .execute(&mut *tx)
        .await?;
    if let Some(old) = previous {
        delete_file(&mut tx, old).await?;
    }

    tx.commit().await?;
    Ok(file_id)
}
