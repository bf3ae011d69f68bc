mod table_catalog;

pub use table_catalog::Catalog;
