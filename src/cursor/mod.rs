//! Cursor composition - the building blocks of the read path
//!
//! This module provides the pieces a field read is assembled from:
//! - The [`Cursor`] capability every batch producer satisfies
//! - [`Batch`], the unit of data flowing between cursors
//! - [`FieldCursor`], the type-erased cursor handed to the query executor
//! - [`CursorRequest`], the immutable per-query descriptor
//!
//! Composition is transparent: the aggregate wrappers in [`aggregate`] and
//! the shard stitcher in [`multi_shard`] both satisfy [`Cursor`], so either
//! can wrap the other's output.

pub mod aggregate;
pub mod multi_shard;

// Re-export commonly used types
pub use aggregate::{build_aggregate_cursor, Aggregate, AggregateKind, CountCursor, SumCursor};
pub use multi_shard::{build_multi_shard_cursor, MultiShardCursor};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::query::error::QueryResult;
use crate::types::{FieldValueRef, TimeRange, Timestamp, ValueType};

// ============================================================================
// Batch
// ============================================================================

/// A bounded, ordered group of (timestamp, value) pairs
///
/// Batches use parallel timestamp/value vectors. Timestamps within a batch
/// follow the direction of the request that produced the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    /// Timestamps in nanoseconds
    pub timestamps: Vec<Timestamp>,

    /// Values, parallel to `timestamps`
    pub values: Vec<T>,
}

impl<T> Batch<T> {
    /// Create a new empty batch with capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Create a batch from parallel vectors
    pub fn new(timestamps: Vec<Timestamp>, values: Vec<T>) -> Self {
        debug_assert_eq!(timestamps.len(), values.len());
        Self { timestamps, values }
    }

    /// Number of rows in the batch
    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if batch is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Add a row to the batch
    pub fn push(&mut self, timestamp: Timestamp, value: T) {
        self.timestamps.push(timestamp);
        self.values.push(value);
    }

    /// The last timestamp in the batch, if any
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.timestamps.last().copied()
    }
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

// ============================================================================
// Cursor Trait
// ============================================================================

/// Common interface for all batch-producing cursors
///
/// Cursors implement a pull-based model: the consumer requests batches until
/// the cursor signals end of stream.
///
/// Returns from [`next_batch`](Cursor::next_batch):
/// - `Ok(Some(batch))` - more data available
/// - `Ok(None)` - no more data (end of stream)
/// - `Err(e)` - error occurred
///
/// Batches are internally time-ordered according to the ascending flag of
/// the request the cursor was created from. A cursor is bound to one value
/// type for its whole lifetime and is never reused across queries.
pub trait Cursor<T>: Send {
    /// Pull the next batch of data
    fn next_batch(&mut self) -> QueryResult<Option<Batch<T>>>;

    /// Release any resources held by the cursor
    ///
    /// Called once when the consumer is done, whether or not the cursor was
    /// exhausted. The default is a no-op for cursors that hold only memory.
    fn close(&mut self) {}
}

// ============================================================================
// Cursor Values
// ============================================================================

mod sealed {
    pub trait Sealed {}
    impl Sealed for f64 {}
    impl Sealed for i64 {}
    impl Sealed for u64 {}
    impl Sealed for String {}
    impl Sealed for bool {}
}

/// A scalar type a cursor can be bound to
///
/// Implemented by exactly the five field types shards store: `f64`, `i64`,
/// `u64`, `String`, `bool`. The trait is sealed; the set is closed by
/// construction, which is what lets the dispatch sites in this module match
/// exhaustively instead of carrying unreachable default arms.
pub trait CursorValue: sealed::Sealed + Clone + Send + 'static {
    /// The tag for this scalar in the [`ValueType`] enumeration
    const VALUE_TYPE: ValueType;

    /// Borrowed view of the value for predicate evaluation
    fn as_field_ref(&self) -> FieldValueRef<'_>;

    /// Wrap a typed cursor into the matching [`FieldCursor`] variant
    fn wrap_cursor(cursor: Box<dyn Cursor<Self>>) -> FieldCursor;

    /// Extract a typed cursor from a [`FieldCursor`]
    ///
    /// Returns the original cursor untouched on a variant mismatch so the
    /// caller can release it and report the offending type.
    fn unwrap_cursor(cursor: FieldCursor) -> Result<Box<dyn Cursor<Self>>, FieldCursor>;
}

impl CursorValue for f64 {
    const VALUE_TYPE: ValueType = ValueType::Float;

    fn as_field_ref(&self) -> FieldValueRef<'_> {
        FieldValueRef::Float(*self)
    }

    fn wrap_cursor(cursor: Box<dyn Cursor<Self>>) -> FieldCursor {
        FieldCursor::Float(cursor)
    }

    fn unwrap_cursor(cursor: FieldCursor) -> Result<Box<dyn Cursor<Self>>, FieldCursor> {
        match cursor {
            FieldCursor::Float(cursor) => Ok(cursor),
            other => Err(other),
        }
    }
}

impl CursorValue for i64 {
    const VALUE_TYPE: ValueType = ValueType::Integer;

    fn as_field_ref(&self) -> FieldValueRef<'_> {
        FieldValueRef::Integer(*self)
    }

    fn wrap_cursor(cursor: Box<dyn Cursor<Self>>) -> FieldCursor {
        FieldCursor::Integer(cursor)
    }

    fn unwrap_cursor(cursor: FieldCursor) -> Result<Box<dyn Cursor<Self>>, FieldCursor> {
        match cursor {
            FieldCursor::Integer(cursor) => Ok(cursor),
            other => Err(other),
        }
    }
}

impl CursorValue for u64 {
    const VALUE_TYPE: ValueType = ValueType::Unsigned;

    fn as_field_ref(&self) -> FieldValueRef<'_> {
        FieldValueRef::Unsigned(*self)
    }

    fn wrap_cursor(cursor: Box<dyn Cursor<Self>>) -> FieldCursor {
        FieldCursor::Unsigned(cursor)
    }

    fn unwrap_cursor(cursor: FieldCursor) -> Result<Box<dyn Cursor<Self>>, FieldCursor> {
        match cursor {
            FieldCursor::Unsigned(cursor) => Ok(cursor),
            other => Err(other),
        }
    }
}

impl CursorValue for String {
    const VALUE_TYPE: ValueType = ValueType::String;

    fn as_field_ref(&self) -> FieldValueRef<'_> {
        FieldValueRef::String(self)
    }

    fn wrap_cursor(cursor: Box<dyn Cursor<Self>>) -> FieldCursor {
        FieldCursor::String(cursor)
    }

    fn unwrap_cursor(cursor: FieldCursor) -> Result<Box<dyn Cursor<Self>>, FieldCursor> {
        match cursor {
            FieldCursor::String(cursor) => Ok(cursor),
            other => Err(other),
        }
    }
}

impl CursorValue for bool {
    const VALUE_TYPE: ValueType = ValueType::Boolean;

    fn as_field_ref(&self) -> FieldValueRef<'_> {
        FieldValueRef::Boolean(*self)
    }

    fn wrap_cursor(cursor: Box<dyn Cursor<Self>>) -> FieldCursor {
        FieldCursor::Boolean(cursor)
    }

    fn unwrap_cursor(cursor: FieldCursor) -> Result<Box<dyn Cursor<Self>>, FieldCursor> {
        match cursor {
            FieldCursor::Boolean(cursor) => Ok(cursor),
            other => Err(other),
        }
    }
}

// ============================================================================
// Field Cursor
// ============================================================================

/// A cursor bound to one of the five field value types
///
/// This is the polymorphic handle the query executor drives: one variant
/// per value type, so the executor can discover the type once at
/// construction and dispatch its encoding accordingly, then pull batches
/// without further type inspection.
pub enum FieldCursor {
    /// Cursor over float values
    Float(Box<dyn Cursor<f64>>),
    /// Cursor over signed integer values
    Integer(Box<dyn Cursor<i64>>),
    /// Cursor over unsigned integer values
    Unsigned(Box<dyn Cursor<u64>>),
    /// Cursor over string values
    String(Box<dyn Cursor<String>>),
    /// Cursor over boolean values
    Boolean(Box<dyn Cursor<bool>>),
}

impl FieldCursor {
    /// The value type this cursor is bound to
    pub fn value_type(&self) -> ValueType {
        match self {
            FieldCursor::Float(_) => ValueType::Float,
            FieldCursor::Integer(_) => ValueType::Integer,
            FieldCursor::Unsigned(_) => ValueType::Unsigned,
            FieldCursor::String(_) => ValueType::String,
            FieldCursor::Boolean(_) => ValueType::Boolean,
        }
    }

    /// Pull the next batch, type-erased
    pub fn next_batch(&mut self) -> QueryResult<Option<FieldBatch>> {
        Ok(match self {
            FieldCursor::Float(cursor) => cursor.next_batch()?.map(FieldBatch::Float),
            FieldCursor::Integer(cursor) => cursor.next_batch()?.map(FieldBatch::Integer),
            FieldCursor::Unsigned(cursor) => cursor.next_batch()?.map(FieldBatch::Unsigned),
            FieldCursor::String(cursor) => cursor.next_batch()?.map(FieldBatch::String),
            FieldCursor::Boolean(cursor) => cursor.next_batch()?.map(FieldBatch::Boolean),
        })
    }

    /// Release the underlying cursor's resources
    pub fn close(&mut self) {
        match self {
            FieldCursor::Float(cursor) => cursor.close(),
            FieldCursor::Integer(cursor) => cursor.close(),
            FieldCursor::Unsigned(cursor) => cursor.close(),
            FieldCursor::String(cursor) => cursor.close(),
            FieldCursor::Boolean(cursor) => cursor.close(),
        }
    }
}

impl fmt::Debug for FieldCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldCursor({})", self.value_type())
    }
}

/// A batch bound to one of the five field value types
///
/// Mirror of [`FieldCursor`] for the data itself.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldBatch {
    /// Batch of float values
    Float(Batch<f64>),
    /// Batch of signed integer values
    Integer(Batch<i64>),
    /// Batch of unsigned integer values
    Unsigned(Batch<u64>),
    /// Batch of string values
    String(Batch<String>),
    /// Batch of boolean values
    Boolean(Batch<bool>),
}

impl FieldBatch {
    /// The value type this batch carries
    pub fn value_type(&self) -> ValueType {
        match self {
            FieldBatch::Float(_) => ValueType::Float,
            FieldBatch::Integer(_) => ValueType::Integer,
            FieldBatch::Unsigned(_) => ValueType::Unsigned,
            FieldBatch::String(_) => ValueType::String,
            FieldBatch::Boolean(_) => ValueType::Boolean,
        }
    }

    /// Number of rows in the batch
    pub fn len(&self) -> usize {
        self.timestamps().len()
    }

    /// Check if batch is empty
    pub fn is_empty(&self) -> bool {
        self.timestamps().is_empty()
    }

    /// Timestamps of the batch, independent of value type
    pub fn timestamps(&self) -> &[Timestamp] {
        match self {
            FieldBatch::Float(batch) => &batch.timestamps,
            FieldBatch::Integer(batch) => &batch.timestamps,
            FieldBatch::Unsigned(batch) => &batch.timestamps,
            FieldBatch::String(batch) => &batch.timestamps,
            FieldBatch::Boolean(batch) => &batch.timestamps,
        }
    }
}

// ============================================================================
// Cursor Request
// ============================================================================

/// Immutable descriptor of a field read
///
/// Built once per logical query and reused unchanged across every shard the
/// read touches. Shards receive it by reference and must not rely on being
/// called in any particular order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorRequest {
    /// Measurement the series belongs to
    pub measurement: String,

    /// Series key identifying one series within the measurement
    pub series_key: String,

    /// Field to read
    pub field: String,

    /// Time window of the read, inclusive on both ends
    pub range: TimeRange,

    /// Whether batches are produced in ascending time order
    ///
    /// Callers supply the shard list pre-sorted to match this direction;
    /// the stitcher concatenates shards, it never re-sorts across them.
    pub ascending: bool,
}

impl CursorRequest {
    /// Create a request covering all time, ascending
    pub fn new(
        measurement: impl Into<String>,
        series_key: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            measurement: measurement.into(),
            series_key: series_key.into(),
            field: field.into(),
            range: TimeRange::all(),
            ascending: true,
        }
    }

    /// Restrict the request to a time range
    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }

    /// Set the time direction of the read
    pub fn with_ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }
}

// ============================================================================
// Test Support
// ============================================================================


// ============================================================================
// Tests
// ============================================================================
