//! Input validation helpers
//!
//! Centralized text length limits. Lengths are counted in characters, not
//! bytes, so multi-byte input is not penalized.

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Listing titles, full names
pub const MAX_NAME_LEN: usize = 200;

/// Listing descriptions
pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// Meetup locations, pickup locations
pub const MAX_LOCATION_LEN: usize = 200;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// Passwords (before hashing)
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

/// URLs / image paths
pub const MAX_URL_LEN: usize = 2048;

/// Image references per listing
pub const MAX_IMAGES: usize = 5;

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty"))
            .with_detail("field", field));
    }
    validate_max_len(value, field, max_len)
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value {
        validate_max_len(v, field, max_len)?;
    }
    Ok(())
}

pub fn validate_max_len(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    let len = char_len(value);
    if len > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({len} chars, max {max_len})"
        ))
        .with_detail("field", field));
    }
    Ok(())
}
