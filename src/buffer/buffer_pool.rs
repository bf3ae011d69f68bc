use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::catalog::Catalog;
use crate::common::{BufferPoolConfig, DbError, PageId, Permissions, Result, TableId, TransactionId};
use crate::concurrency::LockManager;
use crate::storage::page::Page;
use crate::storage::DbFile;
use crate::tuple::Tuple;

use super::LruKReplacer;

/// A cached page. Page content is guarded by the page lock a transaction
/// holds in the `LockManager`; the `RwLock` only protects the in-memory copy
/// while it is being read or mutated.
pub type PageRef = Arc<RwLock<Page>>;

/// BufferPool is the single point of access to table pages.
///
/// Every request first takes the page's lock on behalf of the requesting
/// transaction (shared for `ReadOnly`, exclusive for `ReadWrite`) and then
/// returns the cached copy, loading it from the owning file on a miss. At
/// most `max_pages` pages are cached.
///
/// Dirty pages are never evicted: they may belong to a transaction that has
/// not committed yet, and aborting simply drops them from the cache. If every
/// cached page is dirty or in use, a miss fails with `DbError::BufferPoolFull`.
///
/// Every table served by the pool must use the configured page size; access to
/// a file with another page size fails with `DbError::Format`.
pub struct BufferPool {
    config: BufferPoolConfig,
    catalog: Arc<Catalog>,
    lock_manager: LockManager,
    /// Page table: at most one cached copy per page id
    pages: Mutex<HashMap<PageId, PageRef>>,
    /// LRU-K replacer for eviction decisions among clean pages
    replacer: LruKReplacer,
    /// Pages each live transaction has dirtied
    dirtied: Mutex<HashMap<TransactionId, HashSet<PageId>>>,
}

impl BufferPool {
    pub fn new(config: BufferPoolConfig, catalog: Arc<Catalog>) -> Self {
        Self {
            replacer: LruKReplacer::new(config.lru_k),
            pages: Mutex::new(HashMap::with_capacity(config.max_pages)),
            config,
            catalog,
            lock_manager: LockManager::new(),
            dirtied: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BufferPoolConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    /// Looks up the file of `table_id`, checking its page size against ours.
    fn file(&self, table_id: TableId) -> Result<Arc<DbFile>> {
        let file = self.catalog.file(table_id)?;
        if file.page_size() != self.config.page_size {
            return Err(DbError::Format(format!(
                "table {} has {} byte pages, the buffer pool expects {}",
                table_id,
                file.page_size(),
                self.config.page_size
            )));
        }
        Ok(file)
    }

    /// Returns the page under the lock `perm` maps to, blocking while another
    /// transaction holds a conflicting lock.
    ///
    /// Fails with `DbError::TransactionAborted` if waiting would deadlock.
    pub fn get_page(
        &self,
        tx: TransactionId,
        page_id: PageId,
        perm: Permissions,
    ) -> Result<PageRef> {
        self.lock_manager.acquire(tx, page_id, perm.lock_mode())?;

        let cached = self.pages.lock().get(&page_id).cloned();
        if let Some(page) = cached {
            self.replacer.record_access(page_id);
            return Ok(page);
        }

        // Read outside the page table lock; the page lock keeps writers out.
        let file = self.file(page_id.table_id)?;
        let page = file.read_page(page_id)?;
        trace!(%page_id, %tx, "loaded page");

        let mut pages = self.pages.lock();
        if let Some(existing) = pages.get(&page_id) {
            // A concurrent shared reader loaded it first
            let existing = existing.clone();
            drop(pages);
            self.replacer.record_access(page_id);
            return Ok(existing);
        }
        self.make_room(&mut pages)?;

        let page = Arc::new(RwLock::new(page));
        pages.insert(page_id, page.clone());
        drop(pages);
        self.replacer.record_access(page_id);
        Ok(page)
    }

    /// Evicts clean pages until there is room for one more.
    fn make_room(&self, pages: &mut HashMap<PageId, PageRef>) -> Result<()> {
        while pages.len() >= self.config.max_pages {
            let victim = self.replacer.evict_where(|page_id| match pages.get(page_id) {
                // A page someone is holding a guard on is in use
                Some(page) => page.try_read().is_some_and(|guard| !guard.is_dirty()),
                None => true,
            });

            match victim {
                Some(page_id) => {
                    if pages.remove(&page_id).is_some() {
                        trace!(%page_id, "evicted page");
                    }
                }
                None => {
                    warn!(cached = pages.len(), "no clean page to evict");
                    return Err(DbError::BufferPoolFull);
                }
            }
        }
        Ok(())
    }

    /// Inserts `tuple` into `table_id` on behalf of `tx` and marks every page
    /// the file modified as dirtied by `tx`.
    pub fn insert_tuple(
        &self,
        tx: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> Result<()> {
        let file = self.file(table_id)?;
        let pages = file.insert_tuple(self, tx, tuple)?;
        self.mark_dirtied(tx, pages)
    }

    /// Deletes `tuple` from the table its record id names.
    pub fn delete_tuple(&self, tx: TransactionId, tuple: &Tuple) -> Result<()> {
        let record_id = tuple
            .record_id()
            .ok_or_else(|| DbError::TupleNotFound("tuple has no record id".to_string()))?;
        let file = self.file(record_id.page_id.table_id)?;
        let pages = file.delete_tuple(self, tx, tuple)?;
        self.mark_dirtied(tx, pages)
    }

    /// Marks `pages` dirty with owner `tx` and puts them back in the page
    /// table, in case one was evicted between fetch and mutation. A page is
    /// recorded as dirtied by `tx` only once it is cached again.
    fn mark_dirtied(&self, tx: TransactionId, pages: Vec<PageRef>) -> Result<()> {
        for page in pages {
            let page_id = {
                let mut guard = page.write();
                guard.mark_dirty(true, Some(tx));
                guard.id()
            };

            let reinstalled = {
                let mut cached = self.pages.lock();
                let installed = cached.get(&page_id).is_some_and(|p| Arc::ptr_eq(p, &page));
                if !installed {
                    if !cached.contains_key(&page_id) {
                        self.make_room(&mut cached)?;
                    }
                    cached.insert(page_id, page);
                }
                !installed
            };
            if reinstalled {
                self.replacer.record_access(page_id);
            }
            self.dirtied.lock().entry(tx).or_default().insert(page_id);
        }
        Ok(())
    }

    /// Writes the cached page to its file if it is dirty, then marks it clean.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let Some(page) = self.pages.lock().get(&page_id).cloned() else {
            return Ok(());
        };

        let mut guard = page.write();
        if !guard.is_dirty() {
            return Ok(());
        }
        let file = self.file(page_id.table_id)?;
        file.write_page(&guard)?;
        guard.mark_dirty(false, None);
        guard.set_before_image()?;

        debug!(%page_id, "flushed page");
        Ok(())
    }

    /// Writes every dirty cached page to disk.
    ///
    /// This writes uncommitted changes too; use it only when no transaction is
    /// running, such as at shutdown or in tests.
    pub fn flush_all_pages(&self) -> Result<()> {
        let page_ids: Vec<PageId> = self.pages.lock().keys().copied().collect();
        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Drops the cached copy of `page_id` without writing it.
    pub fn discard_page(&self, page_id: PageId) {
        if self.pages.lock().remove(&page_id).is_some() {
            trace!(%page_id, "discarded page");
        }
        self.replacer.remove(page_id);
    }

    /// Releases `tx`'s lock on one page before the transaction ends.
    ///
    /// This breaks two-phase locking; callers must know the page was not
    /// modified by `tx`.
    pub fn release_page(&self, tx: TransactionId, page_id: PageId) {
        self.lock_manager.release(tx, page_id);
    }

    pub fn holds_lock(&self, tx: TransactionId, page_id: PageId) -> bool {
        self.lock_manager.holds_lock(tx, page_id)
    }

    /// Returns true if a copy of `page_id` is cached.
    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.pages.lock().contains_key(&page_id)
    }

    /// Returns the number of cached pages.
    pub fn cached_pages(&self) -> usize {
        self.pages.lock().len()
    }

    /// Ends `tx`.
    ///
    /// On commit every page `tx` dirtied is written to disk; on abort those
    /// pages are dropped from the cache so the next reader sees the on-disk
    /// version. All of `tx`'s locks are released afterwards in either case.
    ///
    /// A commit fails with `DbError::DirtyPageLost` if one of those pages was
    /// discarded from the cache before it could be written.
    pub fn transaction_complete(&self, tx: TransactionId, commit: bool) -> Result<()> {
        let pages = self.dirtied.lock().remove(&tx).unwrap_or_default();

        let result = if commit {
            pages.iter().try_for_each(|page_id| {
                if !self.is_cached(*page_id) {
                    return Err(DbError::DirtyPageLost(*page_id));
                }
                self.flush_page(*page_id)
            })
        } else {
            Ok(())
        };
        if !commit || result.is_err() {
            for page_id in &pages {
                self.discard_page(*page_id);
            }
        }

        self.lock_manager.release_all(tx);

        match &result {
            Ok(()) => debug!(%tx, commit, pages = pages.len(), "transaction complete"),
            Err(err) => warn!(%tx, error = %err, "commit failed, discarded dirty pages"),
        }
        result
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("config", &self.config)
            .field("cached_pages", &self.cached_pages())
            .finish()
    }
}
