//! Resumes under a user's profile, their work-experience sections, and
//! document uploads.

pub mod handlers;
pub mod repository;

use chrono::NaiveDate;

use crate::errors::AppError;

const MAX_TITLE_CHARS: usize = 200;

pub fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("A resume title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "A resume title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

/// Title for an uploaded document: the supplied title, else the file name
/// without its extension.
pub fn upload_title(supplied: Option<&str>, file_name: &str) -> Result<String, AppError> {
    match supplied.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => validate_title(title),
        None => {
            let stem = file_name
                .rsplit_once('.')
                .map(|(stem, _)| stem)
                .unwrap_or(file_name);
            validate_title(stem).or_else(|_| Ok("Uploaded resume".to_string()))
        }
    }
}

pub fn validate_date_range(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), AppError> {
    match end {
        Some(end) if end < start => Err(AppError::Validation(
            "End date must not be before start date".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_title_prefers_supplied() {
        assert_eq!(upload_title(Some(" Backend CV "), "x.pdf").unwrap(), "Backend CV");
    }

    #[test]
    fn test_upload_title_from_file_name() {
        assert_eq!(upload_title(None, "jane-doe.cv.pdf").unwrap(), "jane-doe.cv");
        assert_eq!(upload_title(Some("   "), "resume.docx").unwrap(), "resume");
        assert_eq!(upload_title(None, ".pdf").unwrap(), "Uploaded resume");
    }

    #[test]
    fn test_blank_title_rejected() {
        assert!(matches!(validate_title("  "), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_date_range() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let before = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert!(validate_date_range(start, None).is_ok());
        assert!(validate_date_range(start, Some(start)).is_ok());
        assert!(validate_date_range(start, Some(before)).is_err());
    }
}
