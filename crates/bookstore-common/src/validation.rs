//! Input validation utilities.
//!
//! Centralized validation helpers used across API routes.

use validator::{Validate, ValidationError};

use crate::error::BookstoreError;

/// Validate a request body, returning a BookstoreError::Validation on failure.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), BookstoreError> {
    body.validate()
        .map_err(|e| BookstoreError::validation(format_validation_errors(e)))
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{field}'"))
            })
        })
        .collect();
    // field_errors() is a HashMap; keep the output stable
    messages.sort();
    messages.join("; ")
}

/// Branch codes are short upper-case tags such as `BR-01`.
pub fn validate_branch_code(code: &str) -> Result<(), ValidationError> {
    let valid = !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("branch_code")
            .with_message("Branch code may only contain A-Z, 0-9 and '-'".into()))
    }
}

/// A branch database name ends up in a connection URI path; PostgreSQL identifiers only.
pub fn validate_db_name(name: &str) -> Result<(), ValidationError> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("db_name").with_message(
            "Database name must be 1-63 chars of a-z, 0-9 and '_', not starting with a digit".into(),
        ))
    }
}
