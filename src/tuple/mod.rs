mod data_type;
mod iterator;
mod schema;
mod tuple;
mod value;

pub use data_type::DataType;
pub(crate) use iterator::ensure_open;
pub use iterator::{IteratorState, TupleIterator};
pub use schema::{Field, TupleDesc, TupleDescBuilder};
pub use tuple::{Tuple, TupleBuilder};
pub use value::Value;
