mod file;
pub mod heap;
pub mod page;

pub use file::DbFile;
