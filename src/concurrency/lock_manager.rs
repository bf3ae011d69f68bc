//! Page-level shared/exclusive locks with wait-for-graph deadlock detection.

use std::collections::{HashMap, HashSet};

use parking_lot::{Condvar, Mutex};
use tracing::{trace, warn};

use crate::common::{DbError, LockMode, PageId, Result, TransactionId};

/// Holders of one page's lock.
///
/// Either any number of shared holders and no exclusive holder, or one
/// exclusive holder and no shared holders.
#[derive(Debug, Default)]
struct PageLock {
    shared: HashSet<TransactionId>,
    exclusive: Option<TransactionId>,
}

impl PageLock {
    fn is_free(&self) -> bool {
        self.shared.is_empty() && self.exclusive.is_none()
    }

    fn grants(&self, tx: TransactionId, mode: LockMode) -> bool {
        match mode {
            LockMode::Shared => self.shared.contains(&tx) || self.exclusive == Some(tx),
            LockMode::Exclusive => self.exclusive == Some(tx),
        }
    }

    /// Returns the other transactions whose locks keep `tx` from taking `mode`.
    fn conflicting_holders(&self, tx: TransactionId, mode: LockMode) -> HashSet<TransactionId> {
        let mut holders = HashSet::new();
        if let Some(holder) = self.exclusive {
            if holder != tx {
                holders.insert(holder);
            }
        }
        if mode == LockMode::Exclusive {
            holders.extend(self.shared.iter().copied().filter(|&h| h != tx));
        }
        holders
    }

    fn remove(&mut self, tx: TransactionId) {
        self.shared.remove(&tx);
        if self.exclusive == Some(tx) {
            self.exclusive = None;
        }
    }
}

#[derive(Debug, Default)]
struct LockTable {
    /// Lock state per page
    locks: HashMap<PageId, PageLock>,
    /// Pages each transaction holds a lock on
    held: HashMap<TransactionId, HashSet<PageId>>,
    /// Edge from a blocked transaction to every transaction it waits on
    waits_for: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl LockTable {
    fn grant(&mut self, tx: TransactionId, page_id: PageId, mode: LockMode) {
        let lock = self.locks.entry(page_id).or_default();
        match mode {
            LockMode::Shared => {
                lock.shared.insert(tx);
            }
            LockMode::Exclusive => {
                // Upgrade in place
                lock.shared.remove(&tx);
                lock.exclusive = Some(tx);
            }
        }
        self.held.entry(tx).or_default().insert(page_id);
    }

    fn release(&mut self, tx: TransactionId, page_id: PageId) {
        if let Some(lock) = self.locks.get_mut(&page_id) {
            lock.remove(tx);
            if lock.is_free() {
                self.locks.remove(&page_id);
            }
        }
    }

    /// Returns true if following wait-for edges from any of `tx`'s blockers
    /// leads back to `tx`.
    fn has_cycle_through(&self, tx: TransactionId) -> bool {
        let Some(blockers) = self.waits_for.get(&tx) else {
            return false;
        };

        let mut visited = HashSet::new();
        let mut stack: Vec<TransactionId> = blockers.iter().copied().collect();
        while let Some(current) = stack.pop() {
            if current == tx {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(next) = self.waits_for.get(&current) {
                stack.extend(next.iter().copied());
            }
        }
        false
    }
}

/// Grants and revokes per-page locks to transactions.
///
/// `acquire` blocks until the lock is compatible with every other holder.
/// Before each wait the caller's wait-for edges are recorded and checked for a
/// cycle; a transaction that would close a cycle is refused with
/// `DbError::TransactionAborted` instead of waiting.
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until `tx` holds `page_id` in at least `mode`.
    pub fn acquire(&self, tx: TransactionId, page_id: PageId, mode: LockMode) -> Result<()> {
        let mut table = self.table.lock();

        loop {
            let blockers = match table.locks.get(&page_id) {
                Some(lock) if lock.grants(tx, mode) => HashSet::new(),
                Some(lock) => lock.conflicting_holders(tx, mode),
                None => HashSet::new(),
            };

            if blockers.is_empty() {
                table.waits_for.remove(&tx);
                if !table.locks.get(&page_id).is_some_and(|l| l.grants(tx, mode)) {
                    table.grant(tx, page_id, mode);
                    trace!(%tx, %page_id, ?mode, "lock granted");
                }
                return Ok(());
            }

            table.waits_for.insert(tx, blockers);
            if table.has_cycle_through(tx) {
                table.waits_for.remove(&tx);
                warn!(%tx, %page_id, ?mode, "deadlock detected, aborting transaction");
                return Err(DbError::TransactionAborted(tx));
            }

            trace!(%tx, %page_id, ?mode, "waiting for lock");
            self.released.wait(&mut table);
        }
    }

    /// Grants the lock if it is available right now, without waiting.
    pub fn try_acquire(&self, tx: TransactionId, page_id: PageId, mode: LockMode) -> bool {
        let mut table = self.table.lock();
        let available = match table.locks.get(&page_id) {
            Some(lock) if lock.grants(tx, mode) => return true,
            Some(lock) => lock.conflicting_holders(tx, mode).is_empty(),
            None => true,
        };
        if available {
            table.grant(tx, page_id, mode);
        }
        available
    }

    /// Releases `tx`'s lock on one page.
    pub fn release(&self, tx: TransactionId, page_id: PageId) {
        let mut table = self.table.lock();
        table.release(tx, page_id);
        let none_left = table.held.get_mut(&tx).is_some_and(|pages| {
            pages.remove(&page_id);
            pages.is_empty()
        });
        if none_left {
            table.held.remove(&tx);
        }
        drop(table);
        self.released.notify_all();
    }

    /// Releases every lock `tx` holds and removes it from the wait-for graph.
    pub fn release_all(&self, tx: TransactionId) {
        let mut table = self.table.lock();
        let pages = table.held.remove(&tx).unwrap_or_default();
        for page_id in &pages {
            table.release(tx, *page_id);
        }
        table.waits_for.remove(&tx);
        for waiting_on in table.waits_for.values_mut() {
            waiting_on.remove(&tx);
        }
        drop(table);

        trace!(%tx, released = pages.len(), "released all locks");
        self.released.notify_all();
    }

    /// Returns true if `tx` holds any lock on `page_id`.
    pub fn holds_lock(&self, tx: TransactionId, page_id: PageId) -> bool {
        self.lock_mode(tx, page_id).is_some()
    }

    /// Returns the strongest mode `tx` holds on `page_id`.
    pub fn lock_mode(&self, tx: TransactionId, page_id: PageId) -> Option<LockMode> {
        let table = self.table.lock();
        let lock = table.locks.get(&page_id)?;
        if lock.exclusive == Some(tx) {
            Some(LockMode::Exclusive)
        } else if lock.shared.contains(&tx) {
            Some(LockMode::Shared)
        } else {
            None
        }
    }

    /// Returns the pages `tx` currently holds a lock on.
    pub fn locked_pages(&self, tx: TransactionId) -> Vec<PageId> {
        let table = self.table.lock();
        table
            .held
            .get(&tx)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the shared holders and the exclusive holder of `page_id`.
    pub fn holders(&self, page_id: PageId) -> (Vec<TransactionId>, Option<TransactionId>) {
        let table = self.table.lock();
        match table.locks.get(&page_id) {
            Some(lock) => (lock.shared.iter().copied().collect(), lock.exclusive),
            None => (Vec::new(), None),
        }
    }
}
