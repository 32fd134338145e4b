//! User-scoped lookup lists: companies, job titles, and locations.
//!
//! All three share one shape (`value` + `label`) and one set of rules, so a
//! single implementation is parameterised by [`LookupKind`].

pub mod handlers;
pub mod repository;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Company,
    JobTitle,
    Location,
}

impl LookupKind {
    pub fn table(self) -> &'static str {
        match self {
            LookupKind::Company => "companies",
            LookupKind::JobTitle => "job_titles",
            LookupKind::Location => "locations",
        }
    }

    /// Foreign-key column naming this kind on `jobs` and `work_experiences`.
    pub fn reference_column(self) -> &'static str {
        match self {
            LookupKind::Company => "company_id",
            LookupKind::JobTitle => "job_title_id",
            LookupKind::Location => "location_id",
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            LookupKind::Company => "company",
            LookupKind::JobTitle => "job title",
            LookupKind::Location => "location",
        }
    }
}

/// Lowercased, trimmed, inner whitespace collapsed. Two labels that
/// normalize to the same value are the same entry for one user.
pub fn normalize_value(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Trims the label and rejects empty or overlong input.
pub fn validate_label(kind: LookupKind, label: &str) -> Result<String, AppError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(AppError::Validation(format!(
            "A {} name is required",
            kind.noun()
        )));
    }
    if label.chars().count() > 200 {
        return Err(AppError::Validation(format!(
            "A {} name must be at most 200 characters",
            kind.noun()
        )));
    }
    Ok(label.to_string())
}

fn plural(count: i64, singular: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {singular}s")
    }
}

/// Message for a delete blocked by references.
pub fn in_use_message(kind: LookupKind, jobs: i64, experiences: i64) -> String {
    format!(
        "Cannot delete this {}: it is used by {} and {}",
        kind.noun(),
        plural(jobs, "job"),
        plural(experiences, "work experience")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value("  Acme   Corp "), "acme corp");
        assert_eq!(normalize_value("ACME corp"), normalize_value("acme Corp"));
    }

    #[test]
    fn test_validate_label_trims() {
        assert_eq!(
            validate_label(LookupKind::Company, "  Acme ").unwrap(),
            "Acme"
        );
    }

    #[test]
    fn test_validate_label_rejects_blank() {
        let err = validate_label(LookupKind::JobTitle, "   ").unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("job title")));
    }

    #[test]
    fn test_in_use_message_counts() {
        assert_eq!(
            in_use_message(LookupKind::Company, 1, 2),
            "Cannot delete this company: it is used by 1 job and 2 work experiences"
        );
    }

    #[test]
    fn test_reference_columns_distinct() {
        let cols = [
            LookupKind::Company.reference_column(),
            LookupKind::JobTitle.reference_column(),
            LookupKind::Location.reference_column(),
        ];
        assert_ne!(cols[0], cols[1]);
        assert_ne!(cols[1], cols[2]);
    }
}
