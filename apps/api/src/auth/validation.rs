use crate::errors::AppError;

pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Canonical form used for storage and comparison: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose syntactic check: one `@`, non-empty local part, dotted domain, no spaces.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|part| !part.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
}

/// Validates sign-up fields, returning the trimmed name and normalized email.
pub fn validate_signup(name: &str, email: &str, password: &str) -> Result<SignupInput, AppError> {
    let name = name.trim();
    if name.chars().count() < MIN_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Name must be at least {MIN_NAME_LEN} characters"
        )));
    }

    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }

    validate_password(password)?;

    Ok(SignupInput {
        name: name.to_string(),
        email,
    })
}
