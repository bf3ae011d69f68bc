mod aggregate;

pub use aggregate::{AggregateIterator, AggregateOp, Aggregator};
