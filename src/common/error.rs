use thiserror::Error;

use super::types::{PageId, RecordId, TableId, TransactionId};

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed page data: {0}")]
    Format(String),

    #[error("Page {0} has no empty slot")]
    PageFull(PageId),

    #[error("Tuple not found: {0}")]
    TupleNotFound(String),

    #[error("Tuple schema does not match the schema of table {0}")]
    SchemaMismatch(TableId),

    #[error("Transaction {0} aborted")]
    TransactionAborted(TransactionId),

    #[error("Page {page_id} out of range, file has {num_pages} pages")]
    PageOutOfRange { page_id: PageId, num_pages: u32 },

    #[error("Table {0} not found")]
    TableNotFound(TableId),

    #[error("Buffer pool is full, no clean page to evict")]
    BufferPoolFull,

    #[error("Dirty page {0} is no longer cached")]
    DirtyPageLost(PageId),

    #[error("Iterator misuse: {0}")]
    IteratorState(&'static str),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Unsupported aggregate: {0}")]
    UnsupportedAggregate(String),
}

impl DbError {
    /// Returns true if the enclosing transaction must be aborted.
    pub fn is_abort(&self) -> bool {
        matches!(self, DbError::TransactionAborted(_))
    }

    pub(crate) fn record_not_found(record_id: RecordId) -> Self {
        DbError::TupleNotFound(format!("no tuple at {}", record_id))
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
