use std::sync::Arc;

use crate::common::{DbError, Result};

use super::{Tuple, TupleDesc};

/// Lifecycle of a tuple iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorState {
    Closed,
    Open,
}

/// A restartable stream of tuples with an explicit open/closed lifecycle.
///
/// `has_next`, `next` and `rewind` are only defined while the iterator is
/// open and fail with `DbError::IteratorState` otherwise. `close` may be
/// called in either state.
pub trait TupleIterator {
    /// Descriptor of the tuples this iterator yields.
    fn desc(&self) -> &Arc<TupleDesc>;

    fn state(&self) -> IteratorState;

    fn open(&mut self) -> Result<()>;

    fn has_next(&mut self) -> Result<bool>;

    fn next(&mut self) -> Result<Tuple>;

    /// Restarts the iteration from the first tuple.
    fn rewind(&mut self) -> Result<()>;

    fn close(&mut self);

    /// Collects every remaining tuple.
    fn drain(&mut self) -> Result<Vec<Tuple>> {
        let mut tuples = Vec::new();
        while self.has_next()? {
            tuples.push(self.next()?);
        }
        Ok(tuples)
    }
}

/// Fails unless `state` is `Open`.
pub(crate) fn ensure_open(state: IteratorState) -> Result<()> {
    match state {
        IteratorState::Open => Ok(()),
        IteratorState::Closed => Err(DbError::IteratorState("iterator is not open")),
    }
}
