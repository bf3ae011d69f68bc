use tracing::warn;

use crate::buffer::{BufferPool, PageRef};
use crate::common::{PageId, Permissions, Result, TableId, TransactionId};
use crate::tuple::Tuple;

/// RAII handle for one transaction.
///
/// The handle ends exactly once: `commit` and `abort` consume it, and
/// dropping a handle that was not ended aborts it, so its locks are released
/// on every exit path.
#[must_use = "dropping a transaction aborts it"]
pub struct Transaction<'a> {
    id: TransactionId,
    pool: &'a BufferPool,
    completed: bool,
}

impl<'a> Transaction<'a> {
    /// Starts a transaction with a fresh id.
    pub fn begin(pool: &'a BufferPool) -> Self {
        Self {
            id: TransactionId::new(),
            pool,
            completed: false,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn pool(&self) -> &'a BufferPool {
        self.pool
    }

    pub fn get_page(&self, page_id: PageId, perm: Permissions) -> Result<PageRef> {
        self.pool.get_page(self.id, page_id, perm)
    }

    pub fn insert_tuple(&self, table_id: TableId, tuple: &mut Tuple) -> Result<()> {
        self.pool.insert_tuple(self.id, table_id, tuple)
    }

    pub fn delete_tuple(&self, tuple: &Tuple) -> Result<()> {
        self.pool.delete_tuple(self.id, tuple)
    }

    /// Flushes the pages this transaction dirtied and releases its locks.
    pub fn commit(mut self) -> Result<()> {
        self.completed = true;
        self.pool.transaction_complete(self.id, true)
    }

    /// Discards the pages this transaction dirtied and releases its locks.
    pub fn abort(mut self) -> Result<()> {
        self.completed = true;
        self.pool.transaction_complete(self.id, false)
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        if let Err(err) = self.pool.transaction_complete(self.id, false) {
            warn!(tx = %self.id, error = %err, "abort on drop failed");
        }
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("completed", &self.completed)
            .finish()
    }
}
