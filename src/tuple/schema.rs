use std::collections::HashMap;
use std::sync::Arc;

use super::DataType;

/// A single field of a tuple descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name, if the field is named
    name: Option<String>,

    /// Field data type
    data_type: DataType,
}

impl Field {
    pub fn new(name: Option<String>, data_type: DataType) -> Self {
        Self { name, data_type }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }
}

/// Describes the layout of a tuple: an ordered list of typed, optionally
/// named fields. Every tuple of a descriptor has the same byte size.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    /// Ordered list of fields
    fields: Vec<Field>,

    /// Map from field name to field index for fast lookup
    name_to_index: HashMap<String, usize>,

    /// Total size of one tuple in bytes
    size: usize,
}

impl TupleDesc {
    /// Creates a descriptor from a list of fields.
    pub fn new(fields: Vec<Field>) -> Self {
        let mut name_to_index = HashMap::new();
        for (i, field) in fields.iter().enumerate() {
            if let Some(name) = &field.name {
                name_to_index.entry(name.clone()).or_insert(i);
            }
        }
        let size = fields.iter().map(|f| f.data_type.size()).sum();

        Self {
            fields,
            name_to_index,
            size,
        }
    }

    /// Creates a descriptor with anonymous fields of the given types.
    pub fn from_types(types: &[DataType]) -> Self {
        Self::new(types.iter().map(|t| Field::new(None, *t)).collect())
    }

    pub fn builder() -> TupleDescBuilder {
        TupleDescBuilder::new()
    }

    /// Returns the number of fields.
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn field_type(&self, index: usize) -> Option<&DataType> {
        self.fields.get(index).map(|f| &f.data_type)
    }

    pub fn field_name(&self, index: usize) -> Option<&str> {
        self.fields.get(index).and_then(|f| f.name())
    }

    /// Returns the index of the first field with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Returns the size of one tuple in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Concatenates two descriptors, `a`'s fields first.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let fields = a.fields.iter().chain(b.fields.iter()).cloned().collect();
        TupleDesc::new(fields)
    }
}

/// Descriptors are equal when their field types match; names are ignored.
impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|(a, b)| a.data_type == b.data_type)
    }
}

impl Eq for TupleDesc {}

/// Builder for constructing descriptors fluently.
pub struct TupleDescBuilder {
    fields: Vec<Field>,
}

impl TupleDescBuilder {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Adds a named field.
    pub fn field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(Field::new(Some(name.into()), data_type));
        self
    }

    /// Adds an anonymous field.
    pub fn anonymous(mut self, data_type: DataType) -> Self {
        self.fields.push(Field::new(None, data_type));
        self
    }

    pub fn build(self) -> TupleDesc {
        TupleDesc::new(self.fields)
    }

    /// Builds the descriptor wrapped in an Arc for shared ownership.
    pub fn build_arc(self) -> Arc<TupleDesc> {
        Arc::new(self.build())
    }
}

impl Default for TupleDescBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_desc() -> TupleDesc {
        TupleDesc::builder()
            .field("id", DataType::Int)
            .field("name", DataType::Text(16))
            .field("balance", DataType::BigInt)
            .build()
    }

    #[test]
    fn test_desc_creation() {
        let desc = create_test_desc();

        assert_eq!(desc.num_fields(), 3);
        assert_eq!(desc.field_name(0), Some("id"));
        assert_eq!(desc.field_type(1), Some(&DataType::Text(16)));
        assert_eq!(desc.field(3), None);
    }

    #[test]
    fn test_size() {
        let desc = create_test_desc();
        assert_eq!(desc.size(), 4 + 20 + 8);
    }

    #[test]
    fn test_name_lookup() {
        let desc = create_test_desc();
        assert_eq!(desc.index_of("balance"), Some(2));
        assert_eq!(desc.index_of("missing"), None);
    }

    #[test]
    fn test_equality_ignores_names() {
        let named = create_test_desc();
        let anonymous =
            TupleDesc::from_types(&[DataType::Int, DataType::Text(16), DataType::BigInt]);
        let other = TupleDesc::from_types(&[DataType::Int, DataType::Int]);

        assert_eq!(named, anonymous);
        assert_ne!(named, other);
    }

    #[test]
    fn test_merge() {
        let a = TupleDesc::builder().field("a", DataType::Int).build();
        let b = TupleDesc::builder()
            .field("b", DataType::Bool)
            .field("c", DataType::Double)
            .build();

        let merged = TupleDesc::merge(&a, &b);
        assert_eq!(merged.num_fields(), 3);
        assert_eq!(merged.field_name(2), Some("c"));
        assert_eq!(merged.size(), 4 + 1 + 8);
    }
}
