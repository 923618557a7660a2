//! Offset pagination utilities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default page size when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Error type for page requests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("Page must be at least 1")]
    InvalidPage,
    #[error("Limit must be between 1 and {MAX_PAGE_SIZE}")]
    InvalidLimit,
}

/// A 1-based page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Builds a page request from optional query values, applying defaults.
    pub fn from_query(page: Option<u32>, limit: Option<u32>) -> Result<Self, PageError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);

        if page == 0 {
            return Err(PageError::InvalidPage);
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(PageError::InvalidLimit);
        }

        Ok(Self { page, limit })
    }

    /// Number of items to skip before this page.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl PageInfo {
    pub fn new(request: &PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total_pages(total, request.limit),
        }
    }
}

/// A page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> Paginated<T> {
    /// Slices `items` according to `request`.
    pub fn from_items(items: Vec<T>, request: &PageRequest) -> Self {
        let total = items.len() as u64;
        let data = items
            .into_iter()
            .skip(request.offset())
            .take(request.limit as usize)
            .collect();

        Self {
            data,
            pagination: PageInfo::new(request, total),
        }
    }

    /// Transforms every item while keeping the pagination metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// Number of pages needed for `total` items at `limit` per page.
pub fn total_pages(total: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let request = PageRequest::from_query(None, None).unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn test_page_request_rejects_zero_page() {
        assert_eq!(
            PageRequest::from_query(Some(0), None),
            Err(PageError::InvalidPage)
        );
    }

    #[test]
    fn test_page_request_rejects_bad_limit() {
        assert_eq!(
            PageRequest::from_query(None, Some(0)),
            Err(PageError::InvalidLimit)
        );
        assert_eq!(
            PageRequest::from_query(None, Some(MAX_PAGE_SIZE + 1)),
            Err(PageError::InvalidLimit)
        );
    }

    #[test]
    fn test_offset() {
        let request = PageRequest { page: 3, limit: 10 };
        assert_eq!(request.offset(), 20);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn test_paginated_from_items() {
        let items: Vec<u32> = (1..=25).collect();
        let page = Paginated::from_items(items, &PageRequest { page: 2, limit: 10 });

        assert_eq!(page.data, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.pagination.total, 25);
        assert_eq!(page.pagination.total_pages, 3);
    }

    #[test]
    fn test_paginated_past_end_is_empty() {
        let items: Vec<u32> = (1..=5).collect();
        let page = Paginated::from_items(items, &PageRequest { page: 4, limit: 10 });
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total, 5);
    }

    #[test]
    fn test_page_info_serialization() {
        let info = PageInfo::new(&PageRequest { page: 1, limit: 20 }, 41);
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"totalPages\":3"));
    }
}
