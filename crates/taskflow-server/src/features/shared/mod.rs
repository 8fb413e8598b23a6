//! Shared utilities and types for feature modules

pub mod pagination;
pub mod validation;

pub use pagination::{PaginationMetadata, PaginationParams};
pub use validation::{
    validate_description, validate_title, DescriptionValidationError, TitleValidationError,
};
