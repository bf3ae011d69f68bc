//! Integration tests for heap files accessed through the buffer pool

use std::sync::Arc;

use heapdb::buffer::BufferPool;
use heapdb::catalog::Catalog;
use heapdb::common::{BufferPoolConfig, DbError, PageId, TableId, TransactionId};
use heapdb::storage::heap::{table_id_for_path, HeapFile};
use heapdb::storage::DbFile;
use heapdb::tuple::{DataType, IteratorState, Tuple, TupleDesc, TupleIterator};
use tempfile::{tempdir, NamedTempFile};

/// 64 byte pages of two Int columns hold 7 tuples each.
const PAGE_SIZE: usize = 64;
const SLOTS: usize = 7;

struct Fixture {
    _temp: NamedTempFile,
    catalog: Arc<Catalog>,
    pool: BufferPool,
    table_id: TableId,
    desc: Arc<TupleDesc>,
}

impl Fixture {
    fn new(max_pages: usize) -> Self {
        let temp = NamedTempFile::new().unwrap();
        let desc: Arc<TupleDesc> = TupleDesc::from_types(&[DataType::Int, DataType::Int]).into();
        let file = HeapFile::open(temp.path(), desc.clone(), PAGE_SIZE).unwrap();

        let catalog = Arc::new(Catalog::new());
        let table_id = catalog.add_table("pairs", file);
        let config = BufferPoolConfig::default()
            .with_page_size(PAGE_SIZE)
            .with_max_pages(max_pages);
        let pool = BufferPool::new(config, catalog.clone());

        Self {
            _temp: temp,
            catalog,
            pool,
            table_id,
            desc,
        }
    }

    fn file(&self) -> Arc<DbFile> {
        self.catalog.file(self.table_id).unwrap()
    }

    fn tuple(&self, a: i32) -> Tuple {
        Tuple::new(self.desc.clone(), vec![a.into(), (-a).into()]).unwrap()
    }

    fn insert_committed(&self, values: impl IntoIterator<Item = i32>) -> Vec<Tuple> {
        let tx = TransactionId::new();
        let tuples = values
            .into_iter()
            .map(|v| {
                let mut t = self.tuple(v);
                self.pool.insert_tuple(tx, self.table_id, &mut t).unwrap();
                t
            })
            .collect();
        self.pool.transaction_complete(tx, true).unwrap();
        tuples
    }

    fn scan(&self) -> Vec<Tuple> {
        let tx = TransactionId::new();
        let file = self.file();
        let mut it = file.iterator(&self.pool, tx);
        it.open().unwrap();
        let tuples = it.drain().unwrap();
        it.close();
        self.pool.transaction_complete(tx, true).unwrap();
        tuples
    }
}

fn first_values(tuples: &[Tuple]) -> Vec<i32> {
    tuples
        .iter()
        .map(|t| match t.value(0) {
            Some(heapdb::tuple::Value::Int(v)) => *v,
            other => panic!("unexpected value {:?}", other),
        })
        .collect()
}

#[test]
fn test_table_id_derived_from_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.dat");
    let desc: Arc<TupleDesc> = TupleDesc::from_types(&[DataType::Int]).into();

    let file = HeapFile::open(&path, desc.clone(), PAGE_SIZE).unwrap();
    let id = file.id();
    drop(file);

    let reopened = HeapFile::open(&path, desc, PAGE_SIZE).unwrap();
    assert_eq!(reopened.id(), id);
    assert_eq!(table_id_for_path(reopened.path()), id);
}

#[test]
fn test_insert_fills_pages_in_order() {
    let fx = Fixture::new(10);
    let tuples = fx.insert_committed(0..(SLOTS as i32 * 2 + 1));

    assert_eq!(fx.file().num_pages().unwrap(), 3);
    for (i, t) in tuples.iter().enumerate() {
        let rid = t.record_id().unwrap();
        assert_eq!(rid.page_id.page_no as usize, i / SLOTS);
        assert_eq!(rid.slot_id.as_usize(), i % SLOTS);
    }
}

#[test]
fn test_new_page_extends_file_before_commit() {
    let fx = Fixture::new(10);
    fx.insert_committed(0..SLOTS as i32);
    assert_eq!(fx.file().num_pages().unwrap(), 1);

    // Page 0 is full, so the next insert appends page 1 and writes it at once
    let tx = TransactionId::new();
    let mut extra = fx.tuple(100);
    fx.pool.insert_tuple(tx, fx.table_id, &mut extra).unwrap();

    let new_page = PageId::new(fx.table_id, 1);
    assert_eq!(fx.file().num_pages().unwrap(), 2);
    assert_eq!(extra.record_id().unwrap().page_id, new_page);
    // The tuple itself waits in the cache for the commit
    let on_disk = fx.file().as_heap().read_page(new_page).unwrap();
    assert_eq!(on_disk.iter().count(), 0);
    assert!(fx.pool.is_cached(new_page));

    fx.pool.transaction_complete(tx, true).unwrap();
    let on_disk = fx.file().as_heap().read_page(new_page).unwrap();
    assert_eq!(on_disk.iter().cloned().collect::<Vec<_>>(), vec![extra]);
}

#[test]
fn test_scan_returns_every_tuple_in_page_order() {
    let fx = Fixture::new(10);
    fx.insert_committed(0..20);

    assert_eq!(first_values(&fx.scan()), (0..20).collect::<Vec<_>>());
}

#[test]
fn test_scan_of_empty_table() {
    let fx = Fixture::new(10);
    assert!(fx.scan().is_empty());
}

#[test]
fn test_iterator_state_machine() {
    let fx = Fixture::new(10);
    fx.insert_committed(0..3);

    let tx = TransactionId::new();
    let file = fx.file();
    let mut it = file.iterator(&fx.pool, tx);

    assert_eq!(it.state(), IteratorState::Closed);
    assert!(matches!(it.has_next(), Err(DbError::IteratorState(_))));
    assert!(matches!(it.next(), Err(DbError::IteratorState(_))));
    assert!(matches!(it.rewind(), Err(DbError::IteratorState(_))));

    it.open().unwrap();
    assert_eq!(it.state(), IteratorState::Open);
    assert_eq!(first_values(&it.drain().unwrap()), vec![0, 1, 2]);
    assert!(!it.has_next().unwrap());
    assert!(matches!(it.next(), Err(DbError::IteratorState(_))));

    it.rewind().unwrap();
    assert_eq!(first_values(&[it.next().unwrap()]), vec![0]);

    it.close();
    assert!(matches!(it.has_next(), Err(DbError::IteratorState(_))));
    fx.pool.transaction_complete(tx, true).unwrap();
}

#[test]
fn test_scan_takes_write_locks() {
    let fx = Fixture::new(10);
    fx.insert_committed(0..SLOTS as i32 + 1);

    let tx = TransactionId::new();
    let file = fx.file();
    let mut it = file.iterator(&fx.pool, tx);
    it.open().unwrap();
    it.drain().unwrap();

    for page_no in 0..2 {
        let page_id = PageId::new(fx.table_id, page_no);
        assert_eq!(
            fx.pool.lock_manager().lock_mode(tx, page_id),
            Some(heapdb::common::LockMode::Exclusive)
        );
    }
    fx.pool.transaction_complete(tx, true).unwrap();
}

#[test]
fn test_delete_through_pool() {
    let fx = Fixture::new(10);
    let tuples = fx.insert_committed(0..10);

    let tx = TransactionId::new();
    fx.pool.delete_tuple(tx, &tuples[3]).unwrap();
    fx.pool.delete_tuple(tx, &tuples[8]).unwrap();
    fx.pool.transaction_complete(tx, true).unwrap();

    let expected: Vec<i32> = (0..10).filter(|v| *v != 3 && *v != 8).collect();
    assert_eq!(first_values(&fx.scan()), expected);
}

#[test]
fn test_delete_foreign_record_is_not_found() {
    let fx = Fixture::new(10);
    let tuples = fx.insert_committed(0..1);

    // Same record id, but past the end of the file
    let mut stray = tuples[0].clone();
    let mut rid = stray.record_id().unwrap();
    rid.page_id.page_no = 5;
    stray.set_record_id(Some(rid));

    let tx = TransactionId::new();
    let err = fx.pool.delete_tuple(tx, &stray).unwrap_err();
    assert!(matches!(err, DbError::TupleNotFound(_)));

    let unplaced = fx.tuple(1);
    assert!(matches!(
        fx.pool.delete_tuple(tx, &unplaced),
        Err(DbError::TupleNotFound(_))
    ));
    fx.pool.transaction_complete(tx, false).unwrap();
}

#[test]
fn test_insert_with_wrong_schema() {
    let fx = Fixture::new(10);
    let mut wrong = Tuple::new(
        TupleDesc::from_types(&[DataType::Int]).into(),
        vec![1.into()],
    )
    .unwrap();

    let tx = TransactionId::new();
    let err = fx.pool.insert_tuple(tx, fx.table_id, &mut wrong).unwrap_err();
    // No page exists yet; the error names the table
    assert!(matches!(err, DbError::SchemaMismatch(id) if id == fx.table_id));
    assert_eq!(fx.file().num_pages().unwrap(), 0);
    fx.pool.transaction_complete(tx, false).unwrap();
}
