use sqlx::PgPool;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::lookups::{in_use_message, normalize_value, LookupKind};
use crate::models::job::LookupRow;

fn duplicate(kind: LookupKind, label: &str) -> AppError {
    AppError::Conflict(format!("A {} named \"{label}\" already exists", kind.noun()))
}

fn not_found(kind: LookupKind, id: Uuid) -> AppError {
    AppError::NotFound(format!("No {} with id {id}", kind.noun()))
}

pub async fn list(pool: &PgPool, kind: LookupKind, user_id: Uuid) -> Result<Vec<LookupRow>, AppError> {
    let sql = format!(
        "SELECT * FROM {} WHERE user_id = $1 ORDER BY label ASC",
        kind.table()
    );
    Ok(sqlx::query_as::<_, LookupRow>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?)
}

pub async fn find(
    pool: &PgPool,
    kind: LookupKind,
    user_id: Uuid,
    id: Uuid,
) -> Result<LookupRow, AppError> {
    let sql = format!(
        "SELECT * FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    );
    sqlx::query_as::<_, LookupRow>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found(kind, id))
}

/// Checks that `id` names a row of `kind` owned by the user.
pub async fn ensure_owned(
    pool: &PgPool,
    kind: LookupKind,
    user_id: Uuid,
    id: Uuid,
) -> Result<(), AppError> {
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1 AND user_id = $2)",
        kind.table()
    );
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(not_found(kind, id))
    }
}

/// `label` must already be validated.
pub async fn create(
    pool: &PgPool,
    kind: LookupKind,
    user_id: Uuid,
    label: &str,
) -> Result<LookupRow, AppError> {
    let sql = format!(
        "INSERT INTO {} (id, user_id, value, label) VALUES ($1, $2, $3, $4) RETURNING *",
        kind.table()
    );
    sqlx::query_as::<_, LookupRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(normalize_value(label))
        .bind(label)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                duplicate(kind, label)
            } else {
                AppError::Database(e)
            }
        })
}

/// Relabels an entry; the normalized value follows the label.
pub async fn rename(
    pool: &PgPool,
    kind: LookupKind,
    user_id: Uuid,
    id: Uuid,
    label: &str,
) -> Result<LookupRow, AppError> {
    let sql = format!(
        r#"
        UPDATE {}
        SET value = $1, label = $2, updated_at = NOW()
        WHERE id = $3 AND user_id = $4
        RETURNING *
        "#,
        kind.table()
    );
    sqlx::query_as::<_, LookupRow>(&sql)
        .bind(normalize_value(label))
        .bind(label)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                duplicate(kind, label)
            } else {
                AppError::Database(e)
            }
        })?
        .ok_or_else(|| not_found(kind, id))
}

/// Jobs and work experiences that reference the entry.
pub async fn reference_counts(
    pool: &PgPool,
    kind: LookupKind,
    id: Uuid,
) -> Result<(i64, i64), AppError> {
    let column = kind.reference_column();
    let sql = format!(
        r#"
        SELECT
            (SELECT COUNT(*) FROM jobs WHERE {column} = $1),
            (SELECT COUNT(*) FROM work_experiences WHERE {column} = $1)
        "#
    );
    Ok(sqlx::query_as::<_, (i64, i64)>(&sql)
        .bind(id)
        .fetch_one(pool)
        .await?)
}

/// Deletes an unreferenced entry. A company's logo file goes with it.
pub async fn delete(
    pool: &PgPool,
    kind: LookupKind,
    user_id: Uuid,
    id: Uuid,
) -> Result<(), AppError> {
    let row = find(pool, kind, user_id, id).await?;

    let (jobs, experiences) = reference_counts(pool, kind, id).await?;
    if jobs > 0 || experiences > 0 {
        return Err(AppError::Conflict(in_use_message(kind, jobs, experiences)));
    }

    let mut tx = pool.begin().await?;
    let sql = format!("DELETE FROM {} WHERE id = $1 AND user_id = $2", kind.table());
    sqlx::query(&sql)
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    if let Some(logo_id) = row.logo_file_id {
        sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(logo_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}
