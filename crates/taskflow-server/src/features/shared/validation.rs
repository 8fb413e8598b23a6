//! Shared validation utilities

use thiserror::Error;

pub const MAX_TITLE_LENGTH: usize = 256;

pub const MAX_DESCRIPTION_LENGTH: usize = 10_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TitleValidationError {
    #[error("Title is required and cannot be empty")]
    Required,

    #[error("Title must be between 1 and {max_length} characters")]
    TooLong { max_length: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DescriptionValidationError {
    #[error("Description must be at most {max_length} characters")]
    TooLong { max_length: usize },
}

/// Title must be non-blank and at most [`MAX_TITLE_LENGTH`] characters
pub fn validate_title(title: &str) -> Result<(), TitleValidationError> {
    if title.trim().is_empty() {
        return Err(TitleValidationError::Required);
    }

    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(TitleValidationError::TooLong {
            max_length: MAX_TITLE_LENGTH,
        });
    }

    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), DescriptionValidationError> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(DescriptionValidationError::TooLong {
            max_length: MAX_DESCRIPTION_LENGTH,
        });
    }
    Ok(())
}
