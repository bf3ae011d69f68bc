//! HeapDB - A page-oriented heap storage engine in Rust
//!
//! Tuples live in fixed-size slotted pages inside flat heap files. A
//! transactional buffer pool mediates every page access under strict
//! two-phase locking, and recovers from aborts by discarding the pages a
//! transaction dirtied instead of keeping a log.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//!
//! - **Tuples** (`tuple`): Schemas, typed values and fixed-width tuples
//!   - `TupleDesc`: Ordered field types of a table
//!   - `Tuple`: Field values plus the record id of their slot
//!   - `TupleIterator`: Open/closed iterator protocol shared by every scan
//!
//! - **Storage Layer** (`storage`): Page layout and file I/O
//!   - `HeapPage`: Occupancy bitmap header followed by fixed-width slots
//!   - `HeapFile`: A table as a sequence of heap pages in one file
//!   - `Page`/`DbFile`: Closed sets of page and file kinds
//!
//! - **Concurrency** (`concurrency`): Page-level shared/exclusive locks with
//!   wait-for-graph deadlock detection
//!
//! - **Buffer Pool** (`buffer`): Bounded page cache
//!   - `BufferPool`: Locks, caches and loads pages; commits and aborts
//!   - `LruKReplacer`: LRU-K choice among clean pages
//!
//! - **Catalog** (`catalog`): Table id to file lookup
//!
//! - **Execution** (`execution`): Grouped aggregation over tuple streams
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use heapdb::buffer::BufferPool;
//! use heapdb::catalog::Catalog;
//! use heapdb::common::BufferPoolConfig;
//! use heapdb::storage::heap::HeapFile;
//! use heapdb::tuple::{DataType, Tuple, TupleDesc, TupleIterator};
//! use heapdb::Transaction;
//!
//! let config = BufferPoolConfig::default();
//! let desc = Arc::new(TupleDesc::from_types(&[DataType::Int, DataType::Text(16)]));
//! let file = HeapFile::open("users.dat", desc.clone(), config.page_size).unwrap();
//!
//! let catalog = Arc::new(Catalog::new());
//! let table_id = catalog.add_table("users", file);
//! let pool = BufferPool::new(config, catalog.clone());
//!
//! // Insert a row and make it durable
//! let tx = Transaction::begin(&pool);
//! let mut row = Tuple::new(desc, vec![1.into(), "ada".into()]).unwrap();
//! tx.insert_tuple(table_id, &mut row).unwrap();
//! tx.commit().unwrap();
//!
//! // Scan it back
//! let tx = Transaction::begin(&pool);
//! let file = catalog.file(table_id).unwrap();
//! let mut scan = file.iterator(&pool, tx.id());
//! scan.open().unwrap();
//! while scan.has_next().unwrap() {
//!     println!("{}", scan.next().unwrap());
//! }
//! scan.close();
//! tx.commit().unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod concurrency;
pub mod execution;
pub mod storage;
pub mod transaction;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{DbError, PageId, Permissions, RecordId, Result, TableId, TransactionId};
pub use transaction::Transaction;
