//! Job applications: CRUD, filtered listing, and the dashboard rollup.
//!
//! Marking a job applied is plan-gated. A job that is already applied is
//! already counted, so edits to it never hit the limit.

pub mod dashboard;
pub mod handlers;
pub mod repository;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::AppError;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page whose offset still fits in an `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

pub const JOB_TYPES: &[&str] = &["full_time", "part_time", "contract", "internship", "freelance"];

/// `GET /api/v1/jobs` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Status value, e.g. `interview`.
    pub status: Option<String>,
    pub search: Option<String>,
    pub applied: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    /// Clamps to 1 <= page <= `MAX_PAGE` and 1 <= limit <= `MAX_PAGE_SIZE`.
    pub fn from_query(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total == 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        }
    }
}

/// `applied_date` to store after a write.
///
/// An explicit date wins. Otherwise a job that becomes applied is stamped
/// with `now`, a job that stays applied keeps its date, and a job that is
/// not applied has none.
pub fn resolve_applied_date(
    applied: bool,
    stored: Option<DateTime<Utc>>,
    supplied: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if !applied {
        return None;
    }
    supplied.or(stored).or(Some(now))
}

pub fn validate_job_type(job_type: &str) -> Result<String, AppError> {
    let job_type = job_type.trim();
    if JOB_TYPES.contains(&job_type) {
        Ok(job_type.to_string())
    } else {
        Err(AppError::Validation(format!(
            "jobType must be one of: {}",
            JOB_TYPES.join(", ")
        )))
    }
}

pub fn validate_description(description: &str) -> Result<String, AppError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(AppError::Validation("A job description is required".to_string()));
    }
    Ok(description.to_string())
}

/// Treats blank strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
