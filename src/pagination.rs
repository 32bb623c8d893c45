//! This modules defines the common functionality for paging data.

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of rows per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a client may request.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// A resolved, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub size: u64,
}

impl Page {
    /// The number of rows to skip to reach this page.
    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.size
    }
}

impl PaginationConfig {
    /// Fill in missing values with the defaults and clamp them to the
    /// supported range.
    pub fn resolve(&self, page: Option<u64>, per_page: Option<u64>) -> Page {
        Page {
            number: page.unwrap_or(self.default_page).max(1),
            size: per_page
                .unwrap_or(self.default_page_size)
                .clamp(1, self.max_page_size),
        }
    }
}
