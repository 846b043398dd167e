//! Shard collaborator interface
//!
//! A shard is an independent unit of stored time-series data. The cursor
//! layer only needs one operation from it: attempt to create a raw cursor
//! for a request. Everything else about a shard - its files, its
//! compaction, how it decides whether a series overlaps - stays behind
//! this trait.

use crate::cursor::{CursorRequest, FieldCursor};
use crate::error::ShardError;

/// Unique identifier of a shard, used in logs
pub type ShardId = u64;

/// An independent unit of stored time-series data
///
/// Implementations must be safe to share across reads; every cursor handed
/// out is exclusively owned by the caller and carries its own state.
pub trait Shard: Send + Sync {
    /// Identifier for this shard
    fn id(&self) -> ShardId;

    /// Attempt to create a raw cursor for a request
    ///
    /// `Ok(None)` means the shard holds no data matching the request's
    /// series, field, and time range - a normal outcome, not an error.
    /// The returned cursor is bound to the field's value type and honors
    /// the request's time bounds and direction.
    ///
    /// Must be cheap to call repeatedly across different shards with the
    /// same request; the stitcher replays one immutable request down an
    /// entire shard list.
    fn create_cursor(&self, request: &CursorRequest) -> Result<Option<FieldCursor>, ShardError>;
}
