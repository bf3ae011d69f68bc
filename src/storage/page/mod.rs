mod heap_page;

pub use heap_page::{check_layout, header_size, slots_per_page, HeapPage, MAX_SLOTS};

use crate::common::{PageId, Result, TransactionId};

/// A page held by the buffer pool.
///
/// Heap pages are the only layout today; other layouts become new variants.
#[derive(Debug, Clone)]
pub enum Page {
    Heap(HeapPage),
}

impl Page {
    pub fn id(&self) -> PageId {
        match self {
            Page::Heap(page) => page.page_id(),
        }
    }

    /// Serializes the page to its on-disk bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Page::Heap(page) => page.to_bytes(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        match self {
            Page::Heap(page) => page.is_dirty(),
        }
    }

    pub fn dirtier(&self) -> Option<TransactionId> {
        match self {
            Page::Heap(page) => page.dirtier(),
        }
    }

    pub fn mark_dirty(&mut self, dirty: bool, tx: Option<TransactionId>) {
        match self {
            Page::Heap(page) => page.mark_dirty(dirty, tx),
        }
    }

    pub fn set_before_image(&mut self) -> Result<()> {
        match self {
            Page::Heap(page) => page.set_before_image(),
        }
    }

    pub fn as_heap(&self) -> &HeapPage {
        match self {
            Page::Heap(page) => page,
        }
    }

    pub fn as_heap_mut(&mut self) -> &mut HeapPage {
        match self {
            Page::Heap(page) => page,
        }
    }
}

impl From<HeapPage> for Page {
    fn from(page: HeapPage) -> Self {
        Page::Heap(page)
    }
}
