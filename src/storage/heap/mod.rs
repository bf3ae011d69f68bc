mod heap_file;
mod iterator;

pub use heap_file::{table_id_for_path, HeapFile};
pub use iterator::HeapFileIterator;
