//! Validation helpers for user-supplied metadata fields.
//!
//! Tags and categories flow into index keys (`tag:{value}`), so the accepted
//! character set is restricted to keep keys unambiguous.

use crate::error::AppError;

pub const MAX_TAG_LENGTH: usize = 64;
pub const MAX_CATEGORY_LENGTH: usize = 64;
pub const MAX_TAGS: usize = 50;

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

pub fn validate_tag(tag: &str) -> Result<(), AppError> {
    if tag.is_empty() || tag.len() > MAX_TAG_LENGTH {
        return Err(AppError::Validation(format!(
            "Tag must be between 1 and {} characters",
            MAX_TAG_LENGTH
        )));
    }
    if !tag.chars().all(is_allowed_char) {
        return Err(AppError::Validation(format!(
            "Tag '{}' contains invalid characters (allowed: a-z, A-Z, 0-9, '_', '-', '.')",
            tag
        )));
    }
    Ok(())
}

pub fn validate_category(category: &str) -> Result<(), AppError> {
    if category.is_empty() || category.len() > MAX_CATEGORY_LENGTH {
        return Err(AppError::Validation(format!(
            "Category must be between 1 and {} characters",
            MAX_CATEGORY_LENGTH
        )));
    }
    if !category.chars().all(is_allowed_char) {
        return Err(AppError::Validation(format!(
            "Category '{}' contains invalid characters",
            category
        )));
    }
    Ok(())
}
