//! Core data types used throughout the read path
//!
//! This module defines the fundamental data structures shared by the cursor
//! layer:
//!
//! - **`Timestamp`**: point in time, nanoseconds since the Unix epoch
//! - **`TimeRange`**: time window for queries (start, end)
//! - **`ValueType`**: the closed set of field value types a cursor can carry
//! - **`FieldValueRef`**: a borrowed, type-tagged view of a single value,
//!   used by pushed-down value filters

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::query::error::QueryError;

/// Timestamp in nanoseconds since the Unix epoch.
pub type Timestamp = i64;

/// Time range for queries (inclusive on both ends)
///
/// Represents a time window [start, end] for reading time-series data.
/// Both bounds are inclusive.
///
/// # Example
///
/// ```rust
/// use strata_tsdb::types::TimeRange;
///
/// let range = TimeRange::new(1000, 2000).unwrap();
/// assert!(range.contains(1000));
/// assert!(range.contains(2000));
/// assert!(!range.contains(999));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start timestamp in nanoseconds (inclusive)
    pub start: Timestamp,

    /// End timestamp in nanoseconds (inclusive)
    pub end: Timestamp,
}

impl TimeRange {
    /// Create a new time range, rejecting inverted bounds
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, QueryError> {
        if start > end {
            return Err(QueryError::validation(format!(
                "invalid time range: start {} > end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The unbounded range covering every representable timestamp
    pub const fn all() -> Self {
        Self {
            start: Timestamp::MIN,
            end: Timestamp::MAX,
        }
    }

    /// Check if a timestamp falls within this range (inclusive)
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::all()
    }
}

/// The closed set of value types a field cursor can be bound to
///
/// Every cursor is permanently bound to exactly one of these for its whole
/// lifetime; the binding is part of the cursor's identity, not a runtime
/// flag. The set is closed: shards never produce values outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// 64-bit IEEE 754 floating point
    Float,
    /// 64-bit signed integer
    Integer,
    /// 64-bit unsigned integer
    Unsigned,
    /// UTF-8 string
    String,
    /// Boolean
    Boolean,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Float => write!(f, "float"),
            ValueType::Integer => write!(f, "integer"),
            ValueType::Unsigned => write!(f, "unsigned"),
            ValueType::String => write!(f, "string"),
            ValueType::Boolean => write!(f, "boolean"),
        }
    }
}

/// A borrowed, type-tagged view of a single field value
///
/// Value filters are evaluated against this view so one opaque predicate
/// can be pushed into cursors of any value type without copying string
/// payloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValueRef<'a> {
    /// A float value
    Float(f64),
    /// A signed integer value
    Integer(i64),
    /// An unsigned integer value
    Unsigned(u64),
    /// A string value
    String(&'a str),
    /// A boolean value
    Boolean(bool),
}

impl FieldValueRef<'_> {
    /// The value type this view carries
    pub fn value_type(&self) -> ValueType {
        match self {
            FieldValueRef::Float(_) => ValueType::Float,
            FieldValueRef::Integer(_) => ValueType::Integer,
            FieldValueRef::Unsigned(_) => ValueType::Unsigned,
            FieldValueRef::String(_) => ValueType::String,
            FieldValueRef::Boolean(_) => ValueType::Boolean,
        }
    }
}
