//! Multi-shard stitching cursor
//!
//! A series' data for one field can live across several shards. The
//! stitcher turns an ordered shard list into one continuous cursor:
//! shards are consumed strictly front-to-back, the first shard with
//! matching data fixes the cursor's value type, and at most one shard
//! cursor is ever open at a time. Callers supply the list pre-sorted to
//! match the request's time direction; shards are concatenated, never
//! merge-interleaved.
//!
//! An optional value predicate is bound at construction and applied to
//! every batch, dropping non-matching rows without reordering anything.

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cursor::{Batch, Cursor, CursorRequest, CursorValue, FieldCursor};
use crate::query::error::{QueryError, QueryResult};
use crate::query::predicate::ValuePredicate;
use crate::shard::Shard;

/// Stitch cursors from an ordered shard list into one logical cursor
///
/// Consumes shards from the front until one yields a cursor; that cursor
/// fixes the value type of the whole read. Shards yielding no data are
/// skipped permanently, as are shards whose cursor creation fails (logged,
/// never retried). `Ok(None)` when the list is exhausted without any shard
/// producing data.
pub fn build_multi_shard_cursor(
    request: CursorRequest,
    shards: Vec<Arc<dyn Shard>>,
    predicate: Option<Arc<dyn ValuePredicate>>,
) -> QueryResult<Option<FieldCursor>> {
    let mut shards: VecDeque<Arc<dyn Shard>> = shards.into();

    let first = match next_shard_cursor(&mut shards, &request) {
        Some(cursor) => cursor,
        None => return Ok(None),
    };

    Ok(Some(match first {
        FieldCursor::Float(cursor) => FieldCursor::Float(Box::new(MultiShardCursor::new(
            cursor, request, shards, predicate,
        ))),
        FieldCursor::Integer(cursor) => FieldCursor::Integer(Box::new(MultiShardCursor::new(
            cursor, request, shards, predicate,
        ))),
        FieldCursor::Unsigned(cursor) => FieldCursor::Unsigned(Box::new(MultiShardCursor::new(
            cursor, request, shards, predicate,
        ))),
        FieldCursor::String(cursor) => FieldCursor::String(Box::new(MultiShardCursor::new(
            cursor, request, shards, predicate,
        ))),
        FieldCursor::Boolean(cursor) => FieldCursor::Boolean(Box::new(MultiShardCursor::new(
            cursor, request, shards, predicate,
        ))),
    }))
}

/// Consume the shard queue from the front until one yields a cursor
fn next_shard_cursor(
    shards: &mut VecDeque<Arc<dyn Shard>>,
    request: &CursorRequest,
) -> Option<FieldCursor> {
    while let Some(shard) = shards.pop_front() {
        match shard.create_cursor(request) {
            Ok(Some(cursor)) => {
                debug!(
                    shard_id = shard.id(),
                    value_type = %cursor.value_type(),
                    field = %request.field,
                    "opened shard cursor"
                );
                return Some(cursor);
            }
            Ok(None) => {
                debug!(shard_id = shard.id(), field = %request.field, "shard has no matching data");
            }
            Err(error) => {
                warn!(
                    shard_id = shard.id(),
                    field = %request.field,
                    %error,
                    "skipping shard after cursor creation failure"
                );
            }
        }
    }
    None
}

/// One logical cursor over the union of an ordered shard list
///
/// Owns the open shard cursor (at most one at any instant) and the queue
/// of shards not yet visited. When the open cursor is exhausted it is
/// released before the queue is consumed for the next one, so resource
/// usage stays O(1) in the shard count. Dropping the cursor mid-stream
/// releases whatever shard cursor is currently open.
pub struct MultiShardCursor<T: CursorValue> {
    /// The currently open shard cursor, if any
    current: Option<Box<dyn Cursor<T>>>,
    /// The request replayed against every remaining shard
    request: CursorRequest,
    /// Shards not yet visited, consumed strictly from the front
    shards: VecDeque<Arc<dyn Shard>>,
    /// Optional pushed-down value filter
    predicate: Option<Arc<dyn ValuePredicate>>,
}

impl<T: CursorValue> MultiShardCursor<T> {
    fn new(
        current: Box<dyn Cursor<T>>,
        request: CursorRequest,
        shards: VecDeque<Arc<dyn Shard>>,
        predicate: Option<Arc<dyn ValuePredicate>>,
    ) -> Self {
        Self {
            current: Some(current),
            request,
            shards,
            predicate,
        }
    }

    /// Release the open shard cursor, if any
    fn release_current(&mut self) {
        if let Some(mut cursor) = self.current.take() {
            cursor.close();
        }
    }

    /// Open the next shard cursor, returning false once the queue is dry
    ///
    /// The first shard fixed the value type for the whole read; a later
    /// shard producing a different type broke the one-type-per-field
    /// contract and is reported as an internal error.
    fn advance(&mut self) -> QueryResult<bool> {
        debug_assert!(self.current.is_none());

        let cursor = match next_shard_cursor(&mut self.shards, &self.request) {
            Some(cursor) => cursor,
            None => return Ok(false),
        };

        match T::unwrap_cursor(cursor) {
            Ok(typed) => {
                self.current = Some(typed);
                Ok(true)
            }
            Err(mut mismatched) => {
                let found = mismatched.value_type();
                mismatched.close();
                Err(QueryError::internal(format!(
                    "shard returned a {} cursor for field '{}' previously typed {}",
                    found,
                    self.request.field,
                    T::VALUE_TYPE
                )))
            }
        }
    }

    /// Drop rows the predicate rejects, preserving order
    fn apply_predicate(&self, batch: Batch<T>) -> Batch<T> {
        let predicate = match &self.predicate {
            Some(predicate) => predicate,
            None => return batch,
        };

        // fast path: leave the batch untouched when every row matches
        let matching = batch
            .values
            .iter()
            .filter(|value| predicate.matches(value.as_field_ref()))
            .count();
        if matching == batch.len() {
            return batch;
        }
        if matching == 0 {
            return Batch::default();
        }

        let Batch { timestamps, values } = batch;
        let mut filtered = Batch::with_capacity(matching);
        for (timestamp, value) in timestamps.into_iter().zip(values) {
            if predicate.matches(value.as_field_ref()) {
                filtered.push(timestamp, value);
            }
        }
        filtered
    }
}

impl<T: CursorValue> Cursor<T> for MultiShardCursor<T> {
    fn next_batch(&mut self) -> QueryResult<Option<Batch<T>>> {
        loop {
            let pulled = match self.current.as_mut() {
                Some(cursor) => cursor.next_batch()?,
                None => {
                    if !self.advance()? {
                        return Ok(None);
                    }
                    continue;
                }
            };

            match pulled {
                Some(batch) => {
                    let batch = self.apply_predicate(batch);
                    // a batch the filter emptied is not end-of-stream; pull again
                    if !batch.is_empty() {
                        return Ok(Some(batch));
                    }
                }
                None => self.release_current(),
            }
        }
    }

    fn close(&mut self) {
        self.release_current();
        self.shards.clear();
    }
}

impl<T: CursorValue> Drop for MultiShardCursor<T> {
    fn drop(&mut self) {
        self.release_current();
    }
}

// ============================================================================
// Tests
// ============================================================================
