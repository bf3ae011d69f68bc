use std::collections::VecDeque;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{DbError, PageId, Permissions, Result, TransactionId};
use crate::tuple::{ensure_open, IteratorState, Tuple, TupleDesc, TupleIterator};

use super::HeapFile;

/// Scans every tuple of a heap file in page then slot order.
///
/// Pages are fetched through the buffer pool one at a time, as the scan
/// reaches them, under the scanning transaction's write permission. The page
/// count is sampled on `open` and again on `rewind`.
pub struct HeapFileIterator<'a> {
    file: &'a HeapFile,
    pool: &'a BufferPool,
    tx: TransactionId,
    state: IteratorState,
    /// Page count observed when the scan (re)started
    num_pages: u32,
    /// Next page to fetch
    next_page: u32,
    /// Remaining tuples of the most recently fetched page
    buffered: VecDeque<Tuple>,
}

impl<'a> HeapFileIterator<'a> {
    pub(crate) fn new(file: &'a HeapFile, pool: &'a BufferPool, tx: TransactionId) -> Self {
        Self {
            file,
            pool,
            tx,
            state: IteratorState::Closed,
            num_pages: 0,
            next_page: 0,
            buffered: VecDeque::new(),
        }
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.tx
    }

    fn restart(&mut self) -> Result<()> {
        self.num_pages = self.file.num_pages()?;
        self.next_page = 0;
        self.buffered.clear();
        Ok(())
    }
}

impl TupleIterator for HeapFileIterator<'_> {
    fn desc(&self) -> &Arc<TupleDesc> {
        self.file.desc()
    }

    fn state(&self) -> IteratorState {
        self.state
    }

    fn open(&mut self) -> Result<()> {
        self.restart()?;
        self.state = IteratorState::Open;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        ensure_open(self.state)?;

        while self.buffered.is_empty() {
            if self.next_page >= self.num_pages {
                return Ok(false);
            }
            let page_id = PageId::new(self.file.id(), self.next_page);
            let page = self.pool.get_page(self.tx, page_id, Permissions::ReadWrite)?;
            self.buffered.extend(page.read().as_heap().iter().cloned());
            self.next_page += 1;
        }

        Ok(true)
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(DbError::IteratorState("no more tuples"));
        }
        self.buffered
            .pop_front()
            .ok_or(DbError::IteratorState("no more tuples"))
    }

    fn rewind(&mut self) -> Result<()> {
        ensure_open(self.state)?;
        self.restart()
    }

    fn close(&mut self) {
        self.state = IteratorState::Closed;
        self.buffered.clear();
    }
}
