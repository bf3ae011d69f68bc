use std::fmt;
use std::sync::Arc;

use bytes::{Buf, BufMut};

use crate::common::{DbError, RecordId, Result};

use super::{TupleDesc, Value};

/// Represents a single row stored in a heap file.
///
/// A tuple holds one value per field of its descriptor and, once it has been
/// placed on a page, the `RecordId` of the slot it lives in.
///
/// ## Tuple Binary Format
///
/// Fields are written back to back in descriptor order, each in the
/// fixed-width encoding of its `DataType`. The encoded length is always
/// `desc.size()`, which is what lets a heap page address tuples by slot.
#[derive(Debug, Clone)]
pub struct Tuple {
    /// The descriptor defining the structure of this tuple
    desc: Arc<TupleDesc>,

    /// The values for each field (in descriptor order)
    values: Vec<Value>,

    /// Location on disk, set once the tuple is stored in a page
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Creates a new tuple, checking every value against the descriptor.
    pub fn new(desc: Arc<TupleDesc>, values: Vec<Value>) -> Result<Self> {
        if values.len() != desc.num_fields() {
            return Err(DbError::InvalidField(format!(
                "expected {} values, got {}",
                desc.num_fields(),
                values.len()
            )));
        }
        for (i, (value, field)) in values.iter().zip(desc.fields()).enumerate() {
            if !value.fits(field.data_type()) {
                return Err(DbError::InvalidField(format!(
                    "field {} of type {} cannot hold {}",
                    i,
                    field.data_type(),
                    value
                )));
            }
        }

        Ok(Self {
            desc,
            values,
            record_id: None,
        })
    }

    /// Returns the descriptor of this tuple.
    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value of the field with the given name.
    pub fn value_by_name(&self, name: &str) -> Option<&Value> {
        self.desc.index_of(name).and_then(|i| self.values.get(i))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Replaces the value at the given index.
    pub fn set_value(&mut self, index: usize, value: Value) -> Result<()> {
        let data_type = self
            .desc
            .field_type(index)
            .ok_or_else(|| DbError::InvalidField(format!("no field at index {}", index)))?;
        if !value.fits(data_type) {
            return Err(DbError::InvalidField(format!(
                "field {} of type {} cannot hold {}",
                index, data_type, value
            )));
        }
        self.values[index] = value;
        Ok(())
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Writes the fixed-width encoding of this tuple.
    pub fn write_to<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        for (value, field) in self.values.iter().zip(self.desc.fields()) {
            value.write_to(field.data_type(), buf)?;
        }
        Ok(())
    }

    /// Reads one tuple of the given descriptor, consuming `desc.size()` bytes.
    pub fn read_from<B: Buf>(desc: Arc<TupleDesc>, buf: &mut B) -> Result<Self> {
        let values = desc
            .fields()
            .map(|field| Value::read_from(field.data_type(), buf))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            desc,
            values,
            record_id: None,
        })
    }
}

/// Tuples compare by descriptor and values; the record id is ignored.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc && self.values == other.values
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

/// Builder for constructing tuples fluently.
pub struct TupleBuilder {
    desc: Arc<TupleDesc>,
    values: Vec<Value>,
}

impl TupleBuilder {
    pub fn new(desc: Arc<TupleDesc>) -> Self {
        let capacity = desc.num_fields();
        Self {
            desc,
            values: Vec::with_capacity(capacity),
        }
    }

    /// Appends the value of the next field.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn build(self) -> Result<Tuple> {
        Tuple::new(self.desc, self.values)
    }
}
