//! Page/limit handling for plan listings.
//!
//! Absent values default to page 1 and [`DEFAULT_LIMIT`]. Anything present
//! that is not a positive integer is rejected rather than silently defaulted.

use serde::Serialize;

use crate::error::PlanError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

/// Page metadata returned alongside a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Build from raw query-string values.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Result<Self, PlanError> {
        let page = match page {
            Some(raw) => positive("page", raw)?,
            None => DEFAULT_PAGE,
        };
        let limit = match limit {
            Some(raw) => positive("limit", raw)?,
            None => DEFAULT_LIMIT,
        };
        if limit > MAX_LIMIT {
            return Err(PlanError::invalid_input(format!(
                "limit must not exceed {MAX_LIMIT}"
            )));
        }
        // Keeps the skip computation representable.
        if page.checked_mul(limit).is_none() {
            return Err(PlanError::invalid_input("page is out of range"));
        }
        Ok(Self { page, limit })
    }

    /// Number of documents to skip before this page.
    pub fn skip(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    /// Page metadata for a collection of `total` documents.
    pub fn info(&self, total: i64) -> PageInfo {
        PageInfo {
            page: self.page,
            limit: self.limit,
            total,
            pages: (total + self.limit - 1) / self.limit,
        }
    }
}

fn positive(name: &str, raw: &str) -> Result<i64, PlanError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            PlanError::invalid_input(format!("{name} must be a positive integer, got {raw:?}"))
        })
}
