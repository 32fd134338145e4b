use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user-scoped lookup row: company, job title, or location.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LookupRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub value: String,
    pub label: String,
    /// Only companies carry a logo.
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_file_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A global reference row: job status or job source.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReferenceRow {
    pub id: Uuid,
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobRow {
    pub id: Uuid,
    pub user_id: Uuid,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A job joined with the labels of everything it references.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    pub id: Uuid,
    pub job_title_id: Uuid,
    pub job_title: String,
    pub company_id: Uuid,
    pub company: String,
    pub company_logo_file_id: Option<Uuid>,
    pub location_id: Uuid,
    pub location: String,
    pub status_id: Uuid,
    pub status: String,
    pub source_id: Option<Uuid>,
    pub source: Option<String>,
    pub job_type: String,
    pub description: String,
    pub job_url: Option<String>,
    pub salary_range: Option<String>,
    pub applied: bool,
    pub applied_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
