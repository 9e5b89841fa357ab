// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::Serialize;

/// Number of embers on one page of the listing.
pub const PER_PAGE: u32 = 10;

/// Which embers show up in the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// Timeline-public embers which are not hidden.
    Public,

    /// All embers, hidden ones included.
    Everything,
}

/// Requested page of the listing, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Returns a request for the given page, anything below 1 becomes the first page.
    pub fn new(page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: PER_PAGE,
        }
    }

    /// Parses a page number from a query value, invalid or missing values become the first page.
    pub fn parse(value: Option<&str>) -> Self {
        let page = value
            .and_then(|value| value.trim().parse::<u32>().ok())
            .unwrap_or(1);
        Self::new(page)
    }

    /// Page number, starting at 1.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Maximum number of items on a page.
    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Number of items to skip.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1)
    }
}

/// One page of items together with the information to navigate to its neighbours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,

    /// Page number, starting at 1.
    pub page: u32,

    /// Maximum number of items on a page.
    pub per_page: u32,

    /// Number of items on all pages.
    pub total: u64,
}

impl<T> Page<T> {
    /// Returns true when there is a page after this one.
    pub fn has_next(&self) -> bool {
        u64::from(self.page) * u64::from(self.per_page) < self.total
    }

    /// Returns true when there is a page before this one.
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}
