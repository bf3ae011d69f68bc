use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::common::{DbError, Result, TableId};
use crate::storage::DbFile;
use crate::tuple::TupleDesc;

struct TableEntry {
    name: String,
    file: Arc<DbFile>,
}

/// Maps table ids to the files that store them.
///
/// The catalog is read far more often than it is written, so lookups share a
/// read lock.
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<HashMap<TableId, TableEntry>>,
    names: RwLock<HashMap<String, TableId>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table. A table with the same name or id is replaced.
    pub fn add_table(&self, name: impl Into<String>, file: impl Into<DbFile>) -> TableId {
        let name = name.into();
        let file: DbFile = file.into();
        let table_id = file.id();

        let mut tables = self.tables.write();
        let mut names = self.names.write();
        if let Some(old) = tables.remove(&table_id) {
            names.remove(&old.name);
        }
        if let Some(old_id) = names.remove(&name) {
            tables.remove(&old_id);
        }

        debug!(%table_id, name = %name, "registered table");
        names.insert(name.clone(), table_id);
        tables.insert(
            table_id,
            TableEntry {
                name,
                file: Arc::new(file),
            },
        );
        table_id
    }

    pub fn file(&self, table_id: TableId) -> Result<Arc<DbFile>> {
        self.tables
            .read()
            .get(&table_id)
            .map(|entry| entry.file.clone())
            .ok_or(DbError::TableNotFound(table_id))
    }

    pub fn desc(&self, table_id: TableId) -> Result<Arc<TupleDesc>> {
        self.file(table_id).map(|file| file.desc().clone())
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.names.read().get(name).copied()
    }

    pub fn table_name(&self, table_id: TableId) -> Option<String> {
        self.tables.read().get(&table_id).map(|e| e.name.clone())
    }

    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.read().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::heap::HeapFile;
    use crate::tuple::DataType;
    use tempfile::NamedTempFile;

    fn heap_file(temp: &NamedTempFile) -> HeapFile {
        let desc = TupleDesc::from_types(&[DataType::Int]).into();
        HeapFile::open(temp.path(), desc, 256).unwrap()
    }

    #[test]
    fn test_add_and_lookup() {
        let temp = NamedTempFile::new().unwrap();
        let catalog = Catalog::new();
        let table_id = catalog.add_table("numbers", heap_file(&temp));

        assert_eq!(catalog.table_id("numbers"), Some(table_id));
        assert_eq!(catalog.table_name(table_id).as_deref(), Some("numbers"));
        assert_eq!(catalog.file(table_id).unwrap().id(), table_id);
        assert_eq!(catalog.desc(table_id).unwrap().num_fields(), 1);
        assert_eq!(catalog.table_ids(), vec![table_id]);
    }

    #[test]
    fn test_missing_table() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.file(TableId::new(5)),
            Err(DbError::TableNotFound(_))
        ));
        assert_eq!(catalog.table_id("nope"), None);
    }

    #[test]
    fn test_rename_replaces_entry() {
        let temp = NamedTempFile::new().unwrap();
        let catalog = Catalog::new();
        let first = catalog.add_table("a", heap_file(&temp));
        let second = catalog.add_table("b", heap_file(&temp));

        assert_eq!(first, second);
        assert_eq!(catalog.table_id("a"), None);
        assert_eq!(catalog.table_id("b"), Some(first));
    }
}
