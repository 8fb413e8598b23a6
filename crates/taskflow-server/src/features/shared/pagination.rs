//! Shared pagination utilities

use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: i64 = 20;

pub const MAX_PER_PAGE: i64 = 100;

/// Page request parameters (1-indexed page, 20 items per page by default)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PaginationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

impl PaginationParams {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self { page, per_page }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    /// Offset for the SQL `OFFSET` clause
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if matches!(self.page, Some(page) if page < 1) {
            return Err("Page must be greater than 0");
        }
        if matches!(self.per_page, Some(per_page) if !(1..=MAX_PER_PAGE).contains(&per_page)) {
            return Err("Per page must be between 1 and 100");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMetadata {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMetadata {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };

        Self {
            page,
            per_page,
            total,
            pages,
            has_next: page < pages,
            has_prev: page > 1,
        }
    }

    pub fn from_params(params: &PaginationParams, total: i64) -> Self {
        Self::new(params.page(), params.per_page(), total)
    }
}
