//! Stored files: resume documents and company logos.
//!
//! File bytes live in the `files` table. Access is always checked through the
//! row that references the file (a resume under the caller's profile, or a
//! company logo), never by file id alone.

pub mod handlers;
pub mod repository;

use crate::errors::AppError;

pub const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_LOGO_BYTES: usize = 1024 * 1024;

pub const RESUME_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
];

pub const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("gif", "image/gif"),
];

fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.trim().to_ascii_lowercase())
}

/// Resolves the MIME type of an upload against `allowed`.
///
/// A declared type on the list is taken as is. A missing or generic type
/// (`application/octet-stream`) falls back to the file extension.
pub fn resolve_type(
    allowed: &[(&str, &'static str)],
    file_name: &str,
    declared: Option<&str>,
) -> Option<&'static str> {
    let declared = declared
        .map(|d| d.split(';').next().unwrap_or(d).trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty() && d != "application/octet-stream");

    match declared {
        Some(mime) => allowed.iter().map(|(_, m)| *m).find(|m| *m == mime),
        None => {
            let ext = extension(file_name)?;
            allowed.iter().find(|(e, _)| *e == ext).map(|(_, m)| *m)
        }
    }
}

pub fn is_allowed(allowed: &[(&str, &str)], mime: &str) -> bool {
    allowed.iter().any(|(_, m)| *m == mime)
}

/// Strips path components and characters that would break a header value.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn attachment_disposition(file_name: &str) -> String {
    format!("attachment; filename=\"{}\"", sanitize_file_name(file_name))
}

/// Size check shared by both upload kinds.
pub fn ensure_size(len: usize, max: usize, what: &str) -> Result<(), AppError> {
    if len == 0 {
        return Err(AppError::Validation(format!("The {what} is empty")));
    }
    if len > max {
        return Err(AppError::Validation(format!(
            "The {what} exceeds the {} MB limit",
            max / (1024 * 1024)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_must_be_listed() {
        assert_eq!(
            resolve_type(RESUME_TYPES, "cv.pdf", Some("application/pdf")),
            Some("application/pdf")
        );
        assert_eq!(resolve_type(RESUME_TYPES, "cv.pdf", Some("text/html")), None);
    }

    #[test]
    fn test_generic_type_falls_back_to_extension() {
        assert_eq!(
            resolve_type(RESUME_TYPES, "CV.DOCX", Some("application/octet-stream")),
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        );
        assert_eq!(resolve_type(IMAGE_TYPES, "logo.jpg", None), Some("image/jpeg"));
        assert_eq!(resolve_type(IMAGE_TYPES, "logo.bmp", None), None);
        assert_eq!(resolve_type(IMAGE_TYPES, "logo", None), None);
    }

    #[test]
    fn test_declared_type_parameters_ignored() {
        assert_eq!(
            resolve_type(IMAGE_TYPES, "x", Some("image/svg+xml; charset=utf-8")),
            Some("image/svg+xml")
        );
    }

    #[test]
    fn test_disposition_sanitizes_name() {
        assert_eq!(
            attachment_disposition("../../etc/\"cv\".pdf"),
            "attachment; filename=\"cv.pdf\""
        );
        assert_eq!(attachment_disposition("\r\n"), "attachment; filename=\"file\"");
    }

    #[test]
    fn test_ensure_size_bounds() {
        assert!(ensure_size(MAX_LOGO_BYTES, MAX_LOGO_BYTES, "logo").is_ok());
        assert!(ensure_size(MAX_LOGO_BYTES + 1, MAX_LOGO_BYTES, "logo").is_err());
        assert!(ensure_size(0, MAX_LOGO_BYTES, "logo").is_err());
    }
}
