use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::buffer::{BufferPool, PageRef};
use crate::common::{DbError, LockMode, PageId, Permissions, Result, TableId, TransactionId};
use crate::storage::page::{check_layout, HeapPage};
use crate::tuple::{Tuple, TupleDesc};

use super::HeapFileIterator;

/// HeapFile stores the tuples of one table, in no particular order, as a
/// flat sequence of fixed-size heap pages. Page `i` lives at byte offset
/// `i * page_size`; there is no file header, so the file length alone
/// determines the page count.
///
/// Reads and writes go straight to the file. Callers outside the buffer pool
/// must not call `write_page`; all page access goes through `BufferPool`.
pub struct HeapFile {
    /// The backing file
    file: Mutex<File>,
    /// Absolute path of the backing file
    path: PathBuf,
    /// Identifier derived from `path`
    table_id: TableId,
    /// Descriptor shared by every tuple in the file
    desc: Arc<TupleDesc>,
    /// Size of each page in bytes
    page_size: usize,
    /// Serializes page appends so two inserters never claim the same page number
    append_lock: Mutex<()>,
    /// Number of page reads performed
    num_reads: AtomicU32,
    /// Number of page writes performed
    num_writes: AtomicU32,
}

/// Derives a table id from the absolute path of its backing file.
pub fn table_id_for_path(path: &Path) -> TableId {
    TableId::new(crc32fast::hash(path.to_string_lossy().as_bytes()))
}

impl HeapFile {
    /// Opens the heap file at `path`, creating an empty file if needed.
    ///
    /// Fails with `DbError::Format` if `desc` and `page_size` give a page
    /// with more slots than a `SlotId` can address.
    pub fn open<P: AsRef<Path>>(path: P, desc: Arc<TupleDesc>, page_size: usize) -> Result<Self> {
        check_layout(page_size, desc.size())?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let path = std::fs::canonicalize(path)?;
        let table_id = table_id_for_path(&path);

        let heap_file = Self {
            file: Mutex::new(file),
            path,
            table_id,
            desc,
            page_size,
            append_lock: Mutex::new(()),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        };
        // Reject files whose length is not a whole number of pages
        let num_pages = heap_file.num_pages()?;
        debug!(
            table_id = %table_id,
            path = %heap_file.path.display(),
            num_pages,
            "opened heap file"
        );

        Ok(heap_file)
    }

    pub fn id(&self) -> TableId {
        self.table_id
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of pages, computed from the file length.
    pub fn num_pages(&self) -> Result<u32> {
        let len = self.file.lock().metadata()?.len();
        let page_size = self.page_size as u64;
        if len % page_size != 0 {
            return Err(DbError::Format(format!(
                "{} is {} bytes, not a multiple of the {} byte page size",
                self.path.display(),
                len,
                page_size
            )));
        }
        Ok((len / page_size) as u32)
    }

    /// Reads one page from disk.
    pub fn read_page(&self, page_id: PageId) -> Result<HeapPage> {
        if page_id.table_id != self.table_id {
            return Err(DbError::TableNotFound(page_id.table_id));
        }
        let num_pages = self.num_pages()?;
        if page_id.page_no >= num_pages {
            return Err(DbError::PageOutOfRange { page_id, num_pages });
        }

        let offset = page_id.page_no as u64 * self.page_size as u64;
        let mut data = vec![0u8; self.page_size];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut data)?;
        }
        self.num_reads.fetch_add(1, Ordering::Relaxed);

        HeapPage::from_bytes(page_id, self.desc.clone(), self.page_size, &data)
    }

    /// Overwrites one page on disk. A page number equal to the current page
    /// count extends the file by one page.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let page_id = page.page_id();
        if page_id.table_id != self.table_id {
            return Err(DbError::TableNotFound(page_id.table_id));
        }
        let data = page.to_bytes()?;

        let mut file = self.file.lock();
        let num_pages = (file.metadata()?.len() / self.page_size as u64) as u32;
        if page_id.page_no > num_pages {
            return Err(DbError::PageOutOfRange { page_id, num_pages });
        }

        let offset = page_id.page_no as u64 * self.page_size as u64;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&data)?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Inserts `tuple` into the first page with a free slot, scanning pages in
    /// order under write permission. When every page is full the file is
    /// extended at once with an empty page, and the tuple goes into the
    /// cached copy of that page like any other insert.
    ///
    /// Returns the cached pages that were modified.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tx: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>> {
        if **tuple.desc() != *self.desc {
            return Err(DbError::SchemaMismatch(self.table_id));
        }

        let mut scanned = 0;
        loop {
            let num_pages = self.num_pages()?;
            for page_no in scanned..num_pages {
                let page_id = PageId::new(self.table_id, page_no);
                let page = pool.get_page(tx, page_id, Permissions::ReadWrite)?;
                {
                    let mut guard = page.write();
                    let heap_page = guard.as_heap_mut();
                    if heap_page.num_empty_slots() == 0 {
                        continue;
                    }
                    heap_page.insert_tuple(tuple)?;
                }
                return Ok(vec![page]);
            }
            scanned = num_pages;

            // The page lock is taken before the append mutex so that waiting
            // on another transaction never happens while holding the mutex.
            let page_id = PageId::new(self.table_id, num_pages);
            pool.lock_manager().acquire(tx, page_id, LockMode::Exclusive)?;

            let append = self.append_lock.lock();
            if self.num_pages()? != num_pages {
                // Another transaction appended first; look at its pages too
                continue;
            }

            // Only the empty page reaches disk here; an abort leaves it empty
            let empty = HeapPage::new_empty(page_id, self.desc.clone(), self.page_size);
            self.write_page(&empty)?;
            drop(append);
            debug!(%page_id, %tx, "appended heap page");

            let page = pool.get_page(tx, page_id, Permissions::ReadWrite)?;
            page.write().as_heap_mut().insert_tuple(tuple)?;
            return Ok(vec![page]);
        }
    }

    /// Removes `tuple` from the page named by its record id.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tx: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>> {
        let record_id = tuple
            .record_id()
            .ok_or_else(|| DbError::TupleNotFound("tuple has no record id".to_string()))?;

        if record_id.page_id.table_id != self.table_id
            || record_id.page_id.page_no >= self.num_pages()?
        {
            return Err(DbError::record_not_found(record_id));
        }

        let page = pool.get_page(tx, record_id.page_id, Permissions::ReadWrite)?;
        page.write().as_heap_mut().delete_tuple(tuple)?;
        Ok(vec![page])
    }

    /// Returns a closed iterator over every tuple of the file.
    pub fn iterator<'a>(&'a self, pool: &'a BufferPool, tx: TransactionId) -> HeapFileIterator<'a> {
        HeapFileIterator::new(self, pool, tx)
    }

    /// Returns the number of page reads performed.
    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of page writes performed.
    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for HeapFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapFile")
            .field("table_id", &self.table_id)
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl Drop for HeapFile {
    fn drop(&mut self) {
        let file = self.file.get_mut();
        let _ = file.sync_all();
    }
}
