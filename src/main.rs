use std::sync::Arc;

use heapdb::buffer::BufferPool;
use heapdb::catalog::Catalog;
use heapdb::common::BufferPoolConfig;
use heapdb::execution::{AggregateOp, Aggregator};
use heapdb::storage::heap::HeapFile;
use heapdb::tuple::{DataType, TupleBuilder, TupleDesc, TupleIterator};
use heapdb::Transaction;

fn main() -> heapdb::Result<()> {
    println!("HeapDB - A page-oriented heap storage engine in Rust");
    println!("====================================================\n");

    let db_path = "demo.dat";
    let config = BufferPoolConfig::default().with_max_pages(10);

    let desc = TupleDesc::builder()
        .field("id", DataType::Int)
        .field("dept", DataType::Text(12))
        .field("salary", DataType::BigInt)
        .build_arc();
    let file = HeapFile::open(db_path, desc.clone(), config.page_size)?;
    println!("Opened heap file: {}", file.path().display());

    let catalog = Arc::new(Catalog::new());
    let table_id = catalog.add_table("employees", file);
    let pool = BufferPool::new(config, catalog.clone());
    println!("Created buffer pool with {} pages\n", config.max_pages);

    // Insert some tuples and commit
    let rows = [
        (1, "eng", 120_000i64),
        (2, "eng", 135_000),
        (3, "sales", 90_000),
        (4, "ops", 80_000),
        (5, "sales", 95_000),
    ];
    let tx = Transaction::begin(&pool);
    for (id, dept, salary) in rows {
        let mut tuple = TupleBuilder::new(desc.clone())
            .value(id)
            .value(dept)
            .value(salary)
            .build()?;
        tx.insert_tuple(table_id, &mut tuple)?;
        if let Some(rid) = tuple.record_id() {
            println!("Inserted tuple at {}", rid);
        }
    }
    tx.commit()?;
    println!("\nCommitted");

    // An aborted insert leaves no trace
    let tx = Transaction::begin(&pool);
    let mut ghost = TupleBuilder::new(desc.clone())
        .value(6)
        .value("eng")
        .value(1i64)
        .build()?;
    tx.insert_tuple(table_id, &mut ghost)?;
    tx.abort()?;
    println!("Aborted an insert\n");

    // Scan the table and compute the average salary per department
    let tx = Transaction::begin(&pool);
    let table = catalog.file(table_id)?;
    let mut scan = table.iterator(&pool, tx.id());
    let mut avg = Aggregator::new(
        Some((1, DataType::Text(12))),
        2,
        DataType::BigInt,
        AggregateOp::Avg,
    )?;

    scan.open()?;
    println!("Reading back table {}:", table_id);
    while scan.has_next()? {
        let tuple = scan.next()?;
        println!("  - {}", tuple);
        avg.merge_tuple(&tuple)?;
    }
    scan.close();

    println!("\nAverage salary per department:");
    let mut results = avg.iterator()?;
    results.open()?;
    for tuple in results.drain()? {
        println!("  - {}", tuple);
    }
    tx.commit()?;

    // Clean up
    drop(table);
    drop(pool);
    drop(catalog);
    std::fs::remove_file(db_path).ok();
    println!("\nDemo completed successfully!");
    Ok(())
}
