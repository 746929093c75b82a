//! Page/limit pagination primitives shared by storefront endpoints.
//!
//! [`PageRequest`] captures a validated one-based page number and page size,
//! and derives the row offset used by storage adapters. [`PageInfo`] is the
//! metadata block returned alongside a page of results: the requested page
//! and limit, the total number of matching rows, the number of pages and the
//! neighbouring page numbers (absent on the first and last page).
//!
//! # Examples
//!
//! ```
//! use pagination::{PageInfo, PageRequest};
//!
//! let request = PageRequest::new(2, 10)?;
//! assert_eq!(request.offset(), 10);
//!
//! let info = PageInfo::new(request, 25);
//! assert_eq!(info.total_page, 3);
//! assert_eq!(info.next, Some(3));
//! assert_eq!(info.prev, Some(1));
//! # Ok::<(), pagination::PaginationError>(())
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page number used when a caller does not supply one.
pub const DEFAULT_PAGE: u32 = 1;

/// Page size used when a caller does not supply one.
pub const DEFAULT_LIMIT: u32 = 10;

/// Validation failures raised while building a [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// Page numbers start at one.
    #[error("page must be at least 1")]
    InvalidPage,
    /// A page must hold at least one row.
    #[error("limit must be at least 1")]
    InvalidLimit,
}

/// A validated request for one page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Build a page request.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::InvalidPage`] when `page` is zero and
    /// [`PaginationError::InvalidLimit`] when `limit` is zero.
    pub const fn new(page: u32, limit: u32) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::InvalidPage);
        }
        if limit == 0 {
            return Err(PaginationError::InvalidLimit);
        }
        Ok(Self { page, limit })
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    /// Maximum number of rows on the page.
    #[must_use]
    pub const fn limit(self) -> u32 {
        self.limit
    }

    /// Number of rows preceding this page: `(page - 1) * limit`.
    #[must_use]
    pub const fn offset(self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Pagination metadata reported with a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Requested page number.
    pub page: u32,
    /// Requested page size.
    pub limit: u32,
    /// Number of rows matching the query across all pages.
    pub total: u64,
    /// Number of pages: `ceil(total / limit)`.
    pub total_page: u64,
    /// Next page number, absent on the last page.
    pub next: Option<u32>,
    /// Previous page number, absent on the first page.
    pub prev: Option<u32>,
}

impl PageInfo {
    /// Derive the metadata for `request` given the total number of rows.
    #[must_use]
    pub fn new(request: PageRequest, total: u64) -> Self {
        let total_page = total.div_ceil(u64::from(request.limit));
        let next = if u64::from(request.page) < total_page {
            request.page.checked_add(1)
        } else {
            None
        };
        let prev = request.page.checked_sub(1).filter(|prev| *prev >= 1);
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_page,
            next,
            prev,
        }
    }
}

/// A page of items together with its pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Items on this page, at most `info.limit` of them.
    pub items: Vec<T>,
    /// Metadata describing where this page sits in the result set.
    pub info: PageInfo,
}

impl<T> Page<T> {
    /// Pair items with their metadata.
    #[must_use]
    pub const fn new(items: Vec<T>, info: PageInfo) -> Self {
        Self { items, info }
    }

    /// Transform every item while keeping the metadata.
    #[must_use]
    pub fn map<U>(self, transform: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(transform).collect(),
            info: self.info,
        }
    }
}
