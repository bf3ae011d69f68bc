/// Default size of a page in bytes (4 KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default buffer pool capacity (number of cached pages)
pub const DEFAULT_MAX_PAGES: usize = 50;

/// Default K value for LRU-K replacement policy
pub const DEFAULT_LRUK_K: usize = 2;

/// Settings fixed when a buffer pool is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Size of every page in bytes
    pub page_size: usize,
    /// Maximum number of pages held in the cache
    pub max_pages: usize,
    /// K for the LRU-K replacer
    pub lru_k: usize,
}

impl BufferPoolConfig {
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            lru_k: DEFAULT_LRUK_K,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_lru_k(mut self, k: usize) -> Self {
        self.lru_k = k;
        self
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new()
    }
}
