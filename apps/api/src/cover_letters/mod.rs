//! Saved cover letters and reusable cover-letter templates.

pub mod handlers;
pub mod repository;

use crate::errors::AppError;

pub const MAX_CONTENT_CHARS: usize = 20_000;

/// Trims and checks a required text field.
pub fn require_text(field: &str, value: &str, max_chars: usize) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(value.to_string())
}
