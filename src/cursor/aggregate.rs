//! Aggregate pushdown cursors
//!
//! Wrapping a raw cursor with one of these reduces every upstream batch to
//! a single (timestamp, value) point before it reaches the query layer, so
//! a windowed SUM or COUNT ships one point per window instead of the raw
//! data. Two reductions exist:
//!
//! - **Sum** is type-preserving and only defined for the numeric types
//! - **Count** always yields integer points, whatever the input type
//!
//! The planner decides when pushdown applies; [`build_aggregate_cursor`] is
//! the dispatch table it drives.

use serde::{Deserialize, Serialize};

use crate::cursor::{Batch, Cursor, CursorValue, FieldCursor};
use crate::query::error::{QueryError, QueryResult};

// ============================================================================
// Aggregate Descriptor
// ============================================================================

/// The reductions that can be pushed down to the storage layer
///
/// Closed set, matched exhaustively: an aggregate kind outside it cannot be
/// constructed, so the factory has no unreachable fallback arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateKind {
    /// Arithmetic sum of each batch, preserving the value type
    Sum,
    /// Number of entries in each batch, as an integer
    Count,
}

/// An aggregate chosen by the query planner for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    /// The reduction to apply
    pub kind: AggregateKind,
    /// The field the reduction applies to
    pub field: String,
}

impl Aggregate {
    /// Sum aggregate over a field
    pub fn sum(field: impl Into<String>) -> Self {
        Self {
            kind: AggregateKind::Sum,
            field: field.into(),
        }
    }

    /// Count aggregate over a field
    pub fn count(field: impl Into<String>) -> Self {
        Self {
            kind: AggregateKind::Count,
            field: field.into(),
        }
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Wrap a cursor according to an aggregate
///
/// `Ok(None)` when `cursor` is absent: aggregating no data is no data, not
/// an error. Sum preserves the cursor's value type; Count rebinds the
/// output to integer regardless of input.
///
/// Sum over a string or boolean cursor returns an internal error: the
/// planner validates field types before choosing pushdown, so a
/// non-numeric sum reaching this factory is a bug upstream, reported
/// loudly rather than coerced into wrong data.
pub fn build_aggregate_cursor(
    aggregate: &Aggregate,
    cursor: Option<FieldCursor>,
) -> QueryResult<Option<FieldCursor>> {
    let cursor = match cursor {
        Some(cursor) => cursor,
        None => return Ok(None),
    };

    match aggregate.kind {
        AggregateKind::Sum => build_sum_cursor(cursor, &aggregate.field).map(Some),
        AggregateKind::Count => Ok(Some(build_count_cursor(cursor))),
    }
}

fn build_sum_cursor(cursor: FieldCursor, field: &str) -> QueryResult<FieldCursor> {
    match cursor {
        FieldCursor::Float(cursor) => Ok(FieldCursor::Float(Box::new(SumCursor::new(cursor)))),
        FieldCursor::Integer(cursor) => Ok(FieldCursor::Integer(Box::new(SumCursor::new(cursor)))),
        FieldCursor::Unsigned(cursor) => {
            Ok(FieldCursor::Unsigned(Box::new(SumCursor::new(cursor))))
        }
        mut cursor @ (FieldCursor::String(_) | FieldCursor::Boolean(_)) => {
            let value_type = cursor.value_type();
            cursor.close();
            Err(QueryError::internal(format!(
                "sum pushed down for non-numeric field '{}' of type {}",
                field, value_type
            )))
        }
    }
}

fn build_count_cursor(cursor: FieldCursor) -> FieldCursor {
    FieldCursor::Integer(match cursor {
        FieldCursor::Float(cursor) => Box::new(CountCursor::new(cursor)),
        FieldCursor::Integer(cursor) => Box::new(CountCursor::new(cursor)),
        FieldCursor::Unsigned(cursor) => Box::new(CountCursor::new(cursor)),
        FieldCursor::String(cursor) => Box::new(CountCursor::new(cursor)),
        FieldCursor::Boolean(cursor) => Box::new(CountCursor::new(cursor)),
    })
}

// ============================================================================
// Sum
// ============================================================================

/// A value type the sum reduction is defined for
///
/// Integer sums wrap on overflow, matching the wraparound semantics of the
/// stored 64-bit types; float sums follow IEEE 754 addition.
pub trait Summable: CursorValue + Copy {
    /// Additive identity
    const ZERO: Self;

    /// Fold one value into the running sum
    fn accumulate(self, value: Self) -> Self;
}

impl Summable for f64 {
    const ZERO: Self = 0.0;

    fn accumulate(self, value: Self) -> Self {
        self + value
    }
}

impl Summable for i64 {
    const ZERO: Self = 0;

    fn accumulate(self, value: Self) -> Self {
        self.wrapping_add(value)
    }
}

impl Summable for u64 {
    const ZERO: Self = 0;

    fn accumulate(self, value: Self) -> Self {
        self.wrapping_add(value)
    }
}

/// Cursor reducing each upstream batch to its arithmetic sum
///
/// One input batch becomes exactly one output point: the sum of the batch's
/// values, stamped with the batch's last timestamp (the window's closing
/// instant). Empty input batches produce nothing and the next batch is
/// pulled instead. There is no accumulation across batches.
pub struct SumCursor<T> {
    input: Box<dyn Cursor<T>>,
}

impl<T: Summable> SumCursor<T> {
    /// Wrap a cursor whose batches each cover one aggregation window
    ///
    /// Precondition: the upstream windowing stage guarantees every batch
    /// `input` produces corresponds to exactly one aggregation window.
    /// This cursor reduces batch boundaries as given; it does not re-window.
    pub fn new(input: Box<dyn Cursor<T>>) -> Self {
        Self { input }
    }
}

impl<T: Summable> Cursor<T> for SumCursor<T> {
    fn next_batch(&mut self) -> QueryResult<Option<Batch<T>>> {
        loop {
            let batch = match self.input.next_batch()? {
                Some(batch) => batch,
                None => return Ok(None),
            };
            let timestamp = match batch.last_timestamp() {
                Some(timestamp) => timestamp,
                // empty window, nothing to emit
                None => continue,
            };
            let total = batch
                .values
                .iter()
                .fold(T::ZERO, |acc, value| acc.accumulate(*value));
            return Ok(Some(Batch::new(vec![timestamp], vec![total])));
        }
    }

    fn close(&mut self) {
        self.input.close();
    }
}

// ============================================================================
// Count
// ============================================================================

/// Cursor reducing each upstream batch to its entry count
///
/// Defined for every value type; the output is always integer. A batch of
/// N strings counts to N exactly as a batch of N floats does. The output
/// point carries the batch's last timestamp, like [`SumCursor`]. The same
/// one-window-per-batch precondition applies.
pub struct CountCursor<T> {
    input: Box<dyn Cursor<T>>,
}

impl<T: CursorValue> CountCursor<T> {
    /// Wrap a cursor whose batches each cover one aggregation window
    pub fn new(input: Box<dyn Cursor<T>>) -> Self {
        Self { input }
    }
}

impl<T: CursorValue> Cursor<i64> for CountCursor<T> {
    fn next_batch(&mut self) -> QueryResult<Option<Batch<i64>>> {
        loop {
            let batch = match self.input.next_batch()? {
                Some(batch) => batch,
                None => return Ok(None),
            };
            let timestamp = match batch.last_timestamp() {
                Some(timestamp) => timestamp,
                None => continue,
            };
            return Ok(Some(Batch::new(vec![timestamp], vec![batch.len() as i64])));
        }
    }

    fn close(&mut self) {
        self.input.close();
    }
}

// ============================================================================
// Tests
// ============================================================================
