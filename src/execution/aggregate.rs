//! Grouped aggregation over a stream of tuples.
//!
//! - [`AggregateOp`]: the supported aggregate functions
//! - [`Aggregator`]: folds tuples into per-group accumulators
//! - [`AggregateIterator`]: yields one result tuple per group

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{ensure_open, DataType, IteratorState, Tuple, TupleDesc, TupleIterator, Value};

/// Supported aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    /// Integer average: sum divided by count, truncated
    Avg,
    Count,
}

impl AggregateOp {
    /// Returns the result type of this op applied to a field of `input` type.
    ///
    /// MIN/MAX keep the input type; everything else is a BigInt.
    pub fn output_type(&self, input: &DataType) -> DataType {
        match self {
            AggregateOp::Min | AggregateOp::Max => *input,
            AggregateOp::Sum | AggregateOp::Avg | AggregateOp::Count => DataType::BigInt,
        }
    }

    fn supports(&self, input: &DataType) -> bool {
        *self == AggregateOp::Count || input.is_integral()
    }
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateOp::Min => write!(f, "MIN"),
            AggregateOp::Max => write!(f, "MAX"),
            AggregateOp::Sum => write!(f, "SUM"),
            AggregateOp::Avg => write!(f, "AVG"),
            AggregateOp::Count => write!(f, "COUNT"),
        }
    }
}

/// Running state of one group.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    /// Min, max or sum, depending on the op
    value: i64,
    count: i64,
}

impl Accumulator {
    fn merge(&mut self, op: AggregateOp, input: Option<i64>) {
        match (op, input) {
            (AggregateOp::Count, _) => {}
            (AggregateOp::Min, Some(v)) => {
                self.value = if self.count == 0 { v } else { self.value.min(v) };
            }
            (AggregateOp::Max, Some(v)) => {
                self.value = if self.count == 0 { v } else { self.value.max(v) };
            }
            (AggregateOp::Sum | AggregateOp::Avg, Some(v)) => {
                self.value = self.value.wrapping_add(v);
            }
            (_, None) => {}
        }
        self.count += 1;
    }

    fn finish(&self, op: AggregateOp) -> i64 {
        match op {
            AggregateOp::Count => self.count,
            AggregateOp::Avg if self.count > 0 => self.value / self.count,
            _ => self.value,
        }
    }
}

/// Computes one aggregate over a field of incoming tuples, optionally grouped
/// by another field.
///
/// Integral fields support every op; any other field type only supports
/// COUNT. Groups are reported in the order they were first seen.
#[derive(Debug)]
pub struct Aggregator {
    group_by: Option<(usize, DataType)>,
    agg_field: usize,
    agg_type: DataType,
    op: AggregateOp,
    groups: Vec<(Option<Value>, Accumulator)>,
    group_index: HashMap<Option<Value>, usize>,
    desc: Arc<TupleDesc>,
}

impl Aggregator {
    pub fn new(
        group_by: Option<(usize, DataType)>,
        agg_field: usize,
        agg_type: DataType,
        op: AggregateOp,
    ) -> Result<Self> {
        if !op.supports(&agg_type) {
            return Err(DbError::UnsupportedAggregate(format!("{op} over {agg_type}")));
        }

        let mut builder = TupleDesc::builder();
        if let Some((_, group_type)) = &group_by {
            builder = builder.field("group", *group_type);
        }
        let desc = builder
            .field(op.to_string().to_lowercase(), op.output_type(&agg_type))
            .build_arc();

        Ok(Self {
            group_by,
            agg_field,
            agg_type,
            op,
            groups: Vec::new(),
            group_index: HashMap::new(),
            desc,
        })
    }

    /// Descriptor of the result tuples: `(group, aggregate)` or `(aggregate)`.
    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn op(&self) -> AggregateOp {
        self.op
    }

    /// Folds `tuple` into its group.
    pub fn merge_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let value = tuple.value(self.agg_field).ok_or_else(|| {
            DbError::InvalidField(format!("no aggregate field {}", self.agg_field))
        })?;
        if !value.fits(&self.agg_type) {
            return Err(DbError::InvalidField(format!(
                "aggregate field {} is not {}",
                self.agg_field, self.agg_type
            )));
        }

        let key = match &self.group_by {
            Some((index, group_type)) => {
                let group = tuple
                    .value(*index)
                    .ok_or_else(|| DbError::InvalidField(format!("no group-by field {index}")))?;
                if !group.fits(group_type) {
                    return Err(DbError::InvalidField(format!(
                        "group-by field {index} is not {group_type}"
                    )));
                }
                Some(group.clone())
            }
            None => None,
        };

        let slot = match self.group_index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.groups.push((key.clone(), Accumulator::default()));
                self.group_index.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        self.groups[slot].1.merge(self.op, value.as_i64());
        Ok(())
    }

    /// Folds every remaining tuple of an open iterator.
    pub fn merge_all(&mut self, input: &mut dyn TupleIterator) -> Result<()> {
        while input.has_next()? {
            let tuple = input.next()?;
            self.merge_tuple(&tuple)?;
        }
        Ok(())
    }

    /// Returns a closed iterator over the current results.
    pub fn iterator(&self) -> Result<AggregateIterator> {
        let results = self
            .groups
            .iter()
            .map(|(group, acc)| {
                let aggregate = self.result_value(acc.finish(self.op));
                let values = match group {
                    Some(group) => vec![group.clone(), aggregate],
                    None => vec![aggregate],
                };
                Tuple::new(self.desc.clone(), values)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AggregateIterator {
            desc: self.desc.clone(),
            results,
            cursor: 0,
            state: IteratorState::Closed,
        })
    }

    fn result_value(&self, v: i64) -> Value {
        match self.op.output_type(&self.agg_type) {
            // MIN/MAX of an Int column stays within i32
            DataType::Int => Value::Int(v as i32),
            _ => Value::BigInt(v),
        }
    }
}

/// Iterator over aggregate results.
#[derive(Debug)]
pub struct AggregateIterator {
    desc: Arc<TupleDesc>,
    results: Vec<Tuple>,
    cursor: usize,
    state: IteratorState,
}

impl TupleIterator for AggregateIterator {
    fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    fn state(&self) -> IteratorState {
        self.state
    }

    fn open(&mut self) -> Result<()> {
        self.state = IteratorState::Open;
        self.cursor = 0;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        ensure_open(self.state)?;
        Ok(self.cursor < self.results.len())
    }

    fn next(&mut self) -> Result<Tuple> {
        ensure_open(self.state)?;
        let tuple = self
            .results
            .get(self.cursor)
            .cloned()
            .ok_or(DbError::IteratorState("no more tuples"))?;
        self.cursor += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) -> Result<()> {
        ensure_open(self.state)?;
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.state = IteratorState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(pairs: &[(i32, i32)]) -> Vec<Tuple> {
        let desc: Arc<TupleDesc> = TupleDesc::from_types(&[DataType::Int, DataType::Int]).into();
        pairs
            .iter()
            .map(|&(g, v)| Tuple::new(Arc::clone(&desc), vec![g.into(), v.into()]).unwrap())
            .collect()
    }

    fn run(agg: &mut Aggregator, input: &[Tuple]) -> Vec<Vec<Value>> {
        for t in input {
            agg.merge_tuple(t).unwrap();
        }
        let mut it = agg.iterator().unwrap();
        it.open().unwrap();
        it.drain()
            .unwrap()
            .into_iter()
            .map(|t| t.values().to_vec())
            .collect()
    }

    #[test]
    fn test_ungrouped_ops() {
        let input = rows(&[(0, 3), (0, 8), (0, 1)]);
        let cases = [
            (AggregateOp::Min, Value::Int(1)),
            (AggregateOp::Max, Value::Int(8)),
            (AggregateOp::Sum, Value::BigInt(12)),
            (AggregateOp::Avg, Value::BigInt(4)),
            (AggregateOp::Count, Value::BigInt(3)),
        ];
        for (op, expected) in cases {
            let mut agg = Aggregator::new(None, 1, DataType::Int, op).unwrap();
            assert_eq!(run(&mut agg, &input), vec![vec![expected]], "{op}");
        }
    }

    #[test]
    fn test_grouped_first_seen_order() {
        let input = rows(&[(2, 10), (1, 5), (2, 20), (1, 6), (3, 1)]);
        let group = Some((0, DataType::Int));
        let mut agg = Aggregator::new(group, 1, DataType::Int, AggregateOp::Avg).unwrap();

        assert_eq!(
            run(&mut agg, &input),
            vec![
                vec![Value::Int(2), Value::BigInt(15)],
                vec![Value::Int(1), Value::BigInt(5)],
                vec![Value::Int(3), Value::BigInt(1)],
            ]
        );
        assert_eq!(agg.desc().num_fields(), 2);
    }

    #[test]
    fn test_text_supports_only_count() {
        let err = Aggregator::new(None, 0, DataType::Text(8), AggregateOp::Sum).unwrap_err();
        assert!(matches!(err, DbError::UnsupportedAggregate(_)));
        assert!(Aggregator::new(None, 0, DataType::Text(8), AggregateOp::Count).is_ok());
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let input = rows(&[(0, 1)]);
        let mut agg = Aggregator::new(None, 1, DataType::BigInt, AggregateOp::Sum).unwrap();
        assert!(matches!(agg.merge_tuple(&input[0]), Err(DbError::InvalidField(_))));
    }

    #[test]
    fn test_iterator_requires_open() {
        let agg = Aggregator::new(None, 1, DataType::Int, AggregateOp::Count).unwrap();
        let mut it = agg.iterator().unwrap();
        assert!(matches!(it.has_next(), Err(DbError::IteratorState(_))));
        it.open().unwrap();
        assert!(!it.has_next().unwrap());
        it.close();
        assert!(it.next().is_err());
    }
}
