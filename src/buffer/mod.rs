mod buffer_pool;
mod lru_k_replacer;

pub use buffer_pool::{BufferPool, PageRef};
pub use lru_k_replacer::LruKReplacer;
