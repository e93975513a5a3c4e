//! Offset paging for event history reads.

/// Which slice of a history to read. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number, starting at 1.
    pub page: u32,
    /// Items per page. Zero is read as one.
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl PageRequest {
    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * self.limit()
    }

    /// Rows to read.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.per_page.max(1))
    }
}

/// One slice of a history and the number of items across all slices.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items in this slice.
    pub items: Vec<T>,
    /// Items across every page.
    pub total: u64,
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
