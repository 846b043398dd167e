//! Strata TSDB - Read-path cursor composition for sharded time-series storage
//!
//! This library builds the single logical cursor a query executor pulls
//! batches from, given a request for one field of one series over a time
//! range. It composes two mechanisms on top of the raw per-shard cursors:
//!
//! - **Multi-shard stitching**: cursors from an ordered list of shards are
//!   concatenated into one continuous cursor with at most one shard cursor
//!   open at a time, plus an optional pushed-down value filter
//! - **Aggregate pushdown**: a raw cursor is wrapped so each batch is
//!   reduced to a single sum or count point before it ever reaches the
//!   query layer
//!
//! Both compositions satisfy the same pull-based [`Cursor`](cursor::Cursor)
//! capability as a raw shard cursor, so they nest in either order.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strata_tsdb::cursor::{build_aggregate_cursor, build_multi_shard_cursor};
//! use strata_tsdb::cursor::{Aggregate, CursorRequest};
//! use strata_tsdb::shard::Shard;
//! use strata_tsdb::types::TimeRange;
//!
//! fn read_total(shards: Vec<Arc<dyn Shard>>) -> strata_tsdb::Result<()> {
//!     let request = CursorRequest::new("cpu", "cpu,host=a", "usage")
//!         .with_range(TimeRange::new(0, 3_600_000)?);
//!     let cursor = build_multi_shard_cursor(request, shards, None)?;
//!     let mut cursor = match build_aggregate_cursor(&Aggregate::sum("usage"), cursor)? {
//!         Some(cursor) => cursor,
//!         None => return Ok(()), // no shard had matching data
//!     };
//!     while let Some(batch) = cursor.next_batch()? {
//!         // one (timestamp, sum) point per upstream window
//!         let _ = batch;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod error;
pub mod query;
pub mod shard;
pub mod types;

// Re-export main types
pub use cursor::{
    build_aggregate_cursor, build_multi_shard_cursor, Aggregate, AggregateKind, Batch, Cursor,
    CursorRequest, FieldBatch, FieldCursor,
};
pub use error::{Error, Result, ShardError};
pub use query::error::{QueryError, QueryErrorKind, QueryResult};
pub use query::predicate::{Predicate, ValuePredicate};
pub use shard::{Shard, ShardId};
pub use types::{FieldValueRef, TimeRange, Timestamp, ValueType};
