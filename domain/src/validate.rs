//! Field-level input validation. Shape checks only; uniqueness and existence
//! are the stores' job.

use crate::{CoreError, NewUser, UserPatch};

/// Minimum length, in characters, of names (profile name, first/last name).
pub const MIN_NAME_LEN: usize = 2;

/// Validate a human-readable name: non-blank and at least [`MIN_NAME_LEN`] characters.
pub fn validate_name(field: &str, s: &str) -> Result<(), CoreError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Invalid(format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() < MIN_NAME_LEN {
        return Err(CoreError::Invalid(format!(
            "{} must be at least {} characters",
            field, MIN_NAME_LEN
        )));
    }
    Ok(())
}

/// Validate an email address. Light check, full RFC compliance is not a goal:
/// `local@domain.tld` with no whitespace and non-empty labels.
pub fn validate_email(s: &str) -> Result<(), CoreError> {
    let invalid = || CoreError::Invalid("email must be a valid email address".into());
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = s.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_new_user(input: &NewUser) -> Result<(), CoreError> {
    validate_name("firstName", &input.first_name)?;
    validate_name("lastName", &input.last_name)?;
    validate_email(&input.email)
}

pub fn validate_user_patch(patch: &UserPatch) -> Result<(), CoreError> {
    if let Some(ref v) = patch.first_name {
        validate_name("firstName", v)?;
    }
    if let Some(ref v) = patch.last_name {
        validate_name("lastName", v)?;
    }
    if let Some(ref v) = patch.email {
        validate_email(v)?;
    }
    Ok(())
}
