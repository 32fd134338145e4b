//! Plain-text renderings of a resume and a job for prompt assembly.

use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::files::repository::find_resume_file;
use crate::models::job::JobDetail;
use crate::models::resume::{ResumeRow, WorkExperienceRow};
use crate::resumes::repository as resumes;

/// Upper bound on document text sent to the model.
pub const MAX_DOCUMENT_CHARS: usize = 24_000;

const PDF_MIME: &str = "application/pdf";

/// Cuts `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn render_resume(
    resume: &ResumeRow,
    experiences: &[WorkExperienceRow],
    document_text: Option<&str>,
) -> String {
    let mut out = format!("Title: {}\n", resume.title);
    if let Some(summary) = resume.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!("Summary: {}\n", summary.trim()));
    }

    if !experiences.is_empty() {
        out.push_str("\nWork experience:\n");
        for exp in experiences {
            let end = exp
                .end_date
                .map(|d| d.format("%Y-%m").to_string())
                .unwrap_or_else(|| "present".to_string());
            out.push_str(&format!("- {} at {}", exp.job_title, exp.company));
            if let Some(location) = &exp.location {
                out.push_str(&format!(" ({location})"));
            }
            out.push_str(&format!(", {} to {end}\n", exp.start_date.format("%Y-%m")));
            if !exp.description.trim().is_empty() {
                out.push_str(&format!("  {}\n", exp.description.trim()));
            }
        }
    }

    if let Some(text) = document_text.map(str::trim).filter(|t| !t.is_empty()) {
        out.push_str("\nResume document:\n");
        out.push_str(truncate_chars(text, MAX_DOCUMENT_CHARS));
        out.push('\n');
    }

    out
}

pub fn render_job(job: &JobDetail) -> String {
    let mut out = format!(
        "Position: {}\nCompany: {}\nLocation: {}\nType: {}\n",
        job.job_title, job.company, job.location, job.job_type
    );
    if let Some(salary) = &job.salary_range {
        out.push_str(&format!("Salary: {salary}\n"));
    }
    out.push_str("\nDescription:\n");
    out.push_str(truncate_chars(job.description.trim(), MAX_DOCUMENT_CHARS));
    out.push('\n');
    out
}

/// Extracts text from a PDF on the blocking pool. Failures are logged and
/// yield `None` so the request can continue on structured data alone.
async fn pdf_text(bytes: Vec<u8>) -> Option<String> {
    match tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await {
        Ok(Ok(text)) => Some(text),
        Ok(Err(e)) => {
            warn!("PDF text extraction failed: {e}");
            None
        }
        Err(e) => {
            warn!("PDF extraction task failed: {e}");
            None
        }
    }
}

/// Loads an owned resume with its experiences and document text.
pub async fn load_resume_text(
    pool: &PgPool,
    user_id: Uuid,
    resume_id: Uuid,
) -> Result<String, AppError> {
    let resume = resumes::find(pool, user_id, resume_id).await?;
    let experiences = resumes::work_experiences(pool, resume.id).await?;

    let document_text = match resume.file_id {
        Some(file_id) => match find_resume_file(pool, user_id, file_id).await? {
            Some(file) if file.file_type == PDF_MIME => pdf_text(file.content).await,
            Some(file) => {
                debug!("Skipping text extraction for {} file {}", file.file_type, file.id);
                None
            }
            None => None,
        },
        None => None,
    };

    Ok(render_resume(&resume, &experiences, document_text.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn resume() -> ResumeRow {
        ResumeRow {
            id: Uuid::nil(),
            profile_id: Uuid::nil(),
            title: "Backend Engineer".to_string(),
            summary: Some("Rust and Postgres".to_string()),
            file_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn experience(end: Option<NaiveDate>) -> WorkExperienceRow {
        WorkExperienceRow {
            id: Uuid::nil(),
            resume_id: Uuid::nil(),
            company_id: Uuid::nil(),
            company: "Acme".to_string(),
            job_title_id: Uuid::nil(),
            job_title: "Engineer".to_string(),
            location_id: None,
            location: Some("Berlin".to_string()),
            start_date: NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(),
            end_date: end,
            description: "Built the billing service".to_string(),
        }
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_render_resume_includes_sections() {
        let text = render_resume(&resume(), &[experience(None)], Some("  PDF body  "));
        assert!(text.starts_with("Title: Backend Engineer\n"));
        assert!(text.contains("Summary: Rust and Postgres"));
        assert!(text.contains("- Engineer at Acme (Berlin), 2021-03 to present"));
        assert!(text.contains("Built the billing service"));
        assert!(text.ends_with("Resume document:\nPDF body\n"));
    }

    #[test]
    fn test_render_resume_without_document() {
        let end = NaiveDate::from_ymd_opt(2023, 6, 30);
        let text = render_resume(&resume(), &[experience(end)], None);
        assert!(text.contains("2021-03 to 2023-06"));
        assert!(!text.contains("Resume document"));
    }
}
