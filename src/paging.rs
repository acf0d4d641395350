//! Page window arithmetic for full-text search.

use crate::config::LimitsConfig;
use crate::error::{Result, SearchError};

/// A validated page request: which window of the ranked result to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub index: u64,
    pub size: u64,
    pub offset: u64,
}

impl PageWindow {
    /// Validate `page` / `size` against the configured limits. A missing size
    /// falls back to `limits.default_page_size`.
    pub fn new(page: i64, size: Option<i64>, limits: &LimitsConfig) -> Result<Self> {
        let size = size.unwrap_or_else(|| i64::from(limits.default_page_size));
        if page < 0 {
            return Err(SearchError::InvalidPaging(format!(
                "page must be >= 0, got {page}"
            )));
        }
        if size <= 0 {
            return Err(SearchError::InvalidPaging(format!(
                "size must be > 0, got {size}"
            )));
        }
        if size > i64::from(limits.max_page_size) {
            return Err(SearchError::InvalidPaging(format!(
                "size {size} exceeds maximum of {}",
                limits.max_page_size
            )));
        }
        // The offset is bound as a signed bigint.
        let offset = page.checked_mul(size).ok_or_else(|| {
            SearchError::InvalidPaging(format!("page {page} with size {size} overflows the offset"))
        })?;

        Ok(Self {
            index: page as u64,
            size: size as u64,
            offset: offset as u64,
        })
    }

    /// Rows this window should hold when `total` rows match.
    pub fn expected_len(&self, total: u64) -> u64 {
        self.size.min(total.saturating_sub(self.offset))
    }

    /// Reconcile the separately measured count with the fetched window.
    ///
    /// A window reaching past the count means rows were added between the two
    /// calls; the count is raised to cover it. A short window leaves the
    /// measured count alone.
    pub fn reconcile_total(&self, measured: u64, fetched: usize) -> u64 {
        let seen = self.offset.saturating_add(fetched as u64);
        if fetched > 0 && seen > measured {
            tracing::warn!(
                measured,
                seen,
                offset = self.offset,
                "Search window extends past measured count, raising total"
            );
            return seen;
        }
        measured
    }
}
