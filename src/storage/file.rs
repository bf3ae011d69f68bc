use std::sync::Arc;

use crate::buffer::{BufferPool, PageRef};
use crate::common::{PageId, Result, TableId, TransactionId};
use crate::tuple::{Tuple, TupleDesc};

use super::heap::{HeapFile, HeapFileIterator};
use super::page::Page;

/// A table's on-disk storage.
///
/// Heap files are the only kind today; other file organizations become new
/// variants.
#[derive(Debug)]
pub enum DbFile {
    Heap(HeapFile),
}

impl DbFile {
    pub fn id(&self) -> TableId {
        match self {
            DbFile::Heap(file) => file.id(),
        }
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        match self {
            DbFile::Heap(file) => file.desc(),
        }
    }

    pub fn page_size(&self) -> usize {
        match self {
            DbFile::Heap(file) => file.page_size(),
        }
    }

    pub fn num_pages(&self) -> Result<u32> {
        match self {
            DbFile::Heap(file) => file.num_pages(),
        }
    }

    pub fn read_page(&self, page_id: PageId) -> Result<Page> {
        match self {
            DbFile::Heap(file) => file.read_page(page_id).map(Page::Heap),
        }
    }

    pub fn write_page(&self, page: &Page) -> Result<()> {
        match (self, page) {
            (DbFile::Heap(file), Page::Heap(page)) => file.write_page(page),
        }
    }

    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tx: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>> {
        match self {
            DbFile::Heap(file) => file.insert_tuple(pool, tx, tuple),
        }
    }

    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tx: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>> {
        match self {
            DbFile::Heap(file) => file.delete_tuple(pool, tx, tuple),
        }
    }

    pub fn iterator<'a>(&'a self, pool: &'a BufferPool, tx: TransactionId) -> HeapFileIterator<'a> {
        match self {
            DbFile::Heap(file) => file.iterator(pool, tx),
        }
    }

    pub fn as_heap(&self) -> &HeapFile {
        match self {
            DbFile::Heap(file) => file,
        }
    }
}

impl From<HeapFile> for DbFile {
    fn from(file: HeapFile) -> Self {
        DbFile::Heap(file)
    }
}
