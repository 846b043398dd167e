//! Integration tests for the read-path cursor composition
//!
//! These tests drive the public API the way the query executor does:
//! - Multi-shard stitching across shard lists with gaps and failures
//! - Aggregate pushdown over stitched cursors
//! - Resource discipline: at most one shard cursor open at any instant,
//!   released on every exit path including early abandonment

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use strata_tsdb::cursor::{
    build_aggregate_cursor, build_multi_shard_cursor, Aggregate, Batch, Cursor, CursorRequest,
    FieldBatch, FieldCursor,
};
use strata_tsdb::error::ShardError;
use strata_tsdb::query::predicate::ValuePredicate;
use strata_tsdb::shard::{Shard, ShardId};
use strata_tsdb::types::{FieldValueRef, TimeRange, ValueType};

// ============================================================================
// Helpers
// ============================================================================

/// Open-cursor accounting shared by every cursor a test hands out
#[derive(Default)]
struct CursorGauge {
    open: usize,
    max_open: usize,
}

type SharedGauge = Arc<Mutex<CursorGauge>>;

fn new_gauge() -> SharedGauge {
    Arc::new(Mutex::new(CursorGauge::default()))
}

fn open_now(gauge: &SharedGauge) -> usize {
    gauge.lock().unwrap().open
}

fn max_open(gauge: &SharedGauge) -> usize {
    gauge.lock().unwrap().max_open
}

/// Cursor over in-memory batches that reports open/close to a gauge
struct TrackedCursor<T> {
    batches: VecDeque<Batch<T>>,
    gauge: SharedGauge,
    closed: bool,
}

impl<T> TrackedCursor<T> {
    fn open(batches: Vec<Batch<T>>, gauge: SharedGauge) -> Self {
        {
            let mut accounting = gauge.lock().unwrap();
            accounting.open += 1;
            accounting.max_open = accounting.max_open.max(accounting.open);
        }
        Self {
            batches: batches.into(),
            gauge,
            closed: false,
        }
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.gauge.lock().unwrap().open -= 1;
        }
    }
}

impl<T: Send> Cursor<T> for TrackedCursor<T> {
    fn next_batch(&mut self) -> strata_tsdb::QueryResult<Option<Batch<T>>> {
        Ok(self.batches.pop_front())
    }

    fn close(&mut self) {
        self.release();
    }
}

impl<T> Drop for TrackedCursor<T> {
    fn drop(&mut self) {
        self.release();
    }
}

/// The typed payload a mock shard serves
enum ShardData {
    Float(Vec<Batch<f64>>),
    Text(Vec<Batch<String>>),
}

/// In-memory shard serving fixed batches, with request accounting
struct MemShard {
    id: ShardId,
    data: Option<ShardData>,
    gauge: SharedGauge,
    fail: bool,
    requests: AtomicUsize,
}

impl MemShard {
    fn floats(id: ShardId, batches: Vec<Batch<f64>>, gauge: &SharedGauge) -> Arc<Self> {
        Arc::new(Self {
            id,
            data: Some(ShardData::Float(batches)),
            gauge: gauge.clone(),
            fail: false,
            requests: AtomicUsize::new(0),
        })
    }

    fn strings(id: ShardId, batches: Vec<Batch<String>>, gauge: &SharedGauge) -> Arc<Self> {
        Arc::new(Self {
            id,
            data: Some(ShardData::Text(batches)),
            gauge: gauge.clone(),
            fail: false,
            requests: AtomicUsize::new(0),
        })
    }

    fn empty(id: ShardId, gauge: &SharedGauge) -> Arc<Self> {
        Arc::new(Self {
            id,
            data: None,
            gauge: gauge.clone(),
            fail: false,
            requests: AtomicUsize::new(0),
        })
    }

    fn failing(id: ShardId, gauge: &SharedGauge) -> Arc<Self> {
        Arc::new(Self {
            id,
            data: None,
            gauge: gauge.clone(),
            fail: true,
            requests: AtomicUsize::new(0),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// Keep only the rows inside the request's time range
fn clip<T: Clone>(batches: &[Batch<T>], range: &TimeRange) -> Vec<Batch<T>> {
    batches
        .iter()
        .map(|batch| {
            let mut clipped = Batch::with_capacity(batch.len());
            for (&timestamp, value) in batch.timestamps.iter().zip(&batch.values) {
                if range.contains(timestamp) {
                    clipped.push(timestamp, value.clone());
                }
            }
            clipped
        })
        .filter(|batch| !batch.is_empty())
        .collect()
}

impl Shard for MemShard {
    fn id(&self) -> ShardId {
        self.id
    }

    fn create_cursor(&self, request: &CursorRequest) -> Result<Option<FieldCursor>, ShardError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ShardError::Unavailable {
                shard_id: self.id,
                reason: "replica offline".to_string(),
            });
        }
        let cursor = match &self.data {
            None => return Ok(None),
            Some(ShardData::Float(batches)) => {
                let clipped = clip(batches, &request.range);
                if clipped.is_empty() {
                    return Ok(None);
                }
                FieldCursor::Float(Box::new(TrackedCursor::open(clipped, self.gauge.clone())))
            }
            Some(ShardData::Text(batches)) => {
                let clipped = clip(batches, &request.range);
                if clipped.is_empty() {
                    return Ok(None);
                }
                FieldCursor::String(Box::new(TrackedCursor::open(clipped, self.gauge.clone())))
            }
        };
        Ok(Some(cursor))
    }
}

struct RejectAll;

impl ValuePredicate for RejectAll {
    fn matches(&self, _value: FieldValueRef<'_>) -> bool {
        false
    }
}

fn float_batch(rows: &[(i64, f64)]) -> Batch<f64> {
    let mut batch = Batch::with_capacity(rows.len());
    for &(timestamp, value) in rows {
        batch.push(timestamp, value);
    }
    batch
}

fn string_batch(rows: &[(i64, &str)]) -> Batch<String> {
    let mut batch = Batch::with_capacity(rows.len());
    for &(timestamp, value) in rows {
        batch.push(timestamp, value.to_string());
    }
    batch
}

fn request() -> CursorRequest {
    CursorRequest::new("cpu", "cpu,host=a", "usage")
}

fn pull_timestamps(cursor: &mut FieldCursor) -> Vec<Vec<i64>> {
    let mut pulled = Vec::new();
    while let Some(batch) = cursor.next_batch().unwrap() {
        pulled.push(batch.timestamps().to_vec());
    }
    pulled
}

// ============================================================================
// Multi-Shard Stitching
// ============================================================================

#[test]
fn stitches_shards_in_order_skipping_cursor_less_ones() {
    let gauge = new_gauge();
    let a = MemShard::floats(
        1,
        vec![float_batch(&[(10, 1.0)]), float_batch(&[(20, 2.0)])],
        &gauge,
    );
    let b = MemShard::empty(2, &gauge);
    let c = MemShard::floats(3, vec![float_batch(&[(30, 3.0)])], &gauge);
    let shards: Vec<Arc<dyn Shard>> = vec![a.clone(), b.clone(), c.clone()];

    let mut cursor = build_multi_shard_cursor(request(), shards, None)
        .unwrap()
        .unwrap();
    assert_eq!(cursor.value_type(), ValueType::Float);

    // caller-observed sequence: A.batch1, A.batch2, C.batch1, end of stream
    let pulled = pull_timestamps(&mut cursor);
    assert_eq!(pulled, vec![vec![10], vec![20], vec![30]]);

    assert_eq!(a.request_count(), 1);
    assert_eq!(b.request_count(), 1);
    assert_eq!(c.request_count(), 1);
    assert_eq!(open_now(&gauge), 0);
}

#[test]
fn at_most_one_cursor_open_across_full_pull() {
    let gauge = new_gauge();
    let shards: Vec<Arc<dyn Shard>> = (1..=5)
        .map(|id| -> Arc<dyn Shard> {
            MemShard::floats(id, vec![float_batch(&[(id as i64 * 10, 1.0)])], &gauge)
        })
        .collect();

    let mut cursor = build_multi_shard_cursor(request(), shards, None)
        .unwrap()
        .unwrap();
    let pulled = pull_timestamps(&mut cursor);

    assert_eq!(pulled.len(), 5);
    assert_eq!(max_open(&gauge), 1);
    assert_eq!(open_now(&gauge), 0);
}

#[test]
fn dropping_mid_stream_releases_the_open_cursor() {
    let gauge = new_gauge();
    let shards: Vec<Arc<dyn Shard>> = vec![
        MemShard::floats(
            1,
            vec![float_batch(&[(10, 1.0)]), float_batch(&[(20, 2.0)])],
            &gauge,
        ),
        MemShard::floats(2, vec![float_batch(&[(30, 3.0)])], &gauge),
    ];

    let mut cursor = build_multi_shard_cursor(request(), shards, None)
        .unwrap()
        .unwrap();
    // pull one batch, abandon the rest
    assert!(cursor.next_batch().unwrap().is_some());
    assert_eq!(open_now(&gauge), 1);

    drop(cursor);
    assert_eq!(open_now(&gauge), 0);
}

#[test]
fn explicit_close_releases_the_open_cursor() {
    let gauge = new_gauge();
    let shards: Vec<Arc<dyn Shard>> =
        vec![MemShard::floats(1, vec![float_batch(&[(10, 1.0)])], &gauge)];

    let mut cursor = build_multi_shard_cursor(request(), shards, None)
        .unwrap()
        .unwrap();
    assert_eq!(open_now(&gauge), 1);
    cursor.close();
    assert_eq!(open_now(&gauge), 0);
}

#[test]
fn failing_shard_is_skipped_not_retried() {
    let gauge = new_gauge();
    let a = MemShard::floats(1, vec![float_batch(&[(10, 1.0)])], &gauge);
    let broken = MemShard::failing(2, &gauge);
    let c = MemShard::floats(3, vec![float_batch(&[(30, 3.0)])], &gauge);
    let shards: Vec<Arc<dyn Shard>> = vec![a, broken.clone(), c];

    let mut cursor = build_multi_shard_cursor(request(), shards, None)
        .unwrap()
        .unwrap();
    let pulled = pull_timestamps(&mut cursor);

    assert_eq!(pulled, vec![vec![10], vec![30]]);
    assert_eq!(broken.request_count(), 1);
}

#[test]
fn time_range_travels_unchanged_to_every_shard() {
    let gauge = new_gauge();
    let shards: Vec<Arc<dyn Shard>> = vec![
        MemShard::floats(
            1,
            vec![float_batch(&[(10, 1.0), (20, 2.0), (90, 9.0)])],
            &gauge,
        ),
        MemShard::floats(2, vec![float_batch(&[(95, 9.5), (120, 12.0)])], &gauge),
    ];

    let request = request().with_range(TimeRange::new(15, 100).unwrap());
    let mut cursor = build_multi_shard_cursor(request, shards, None)
        .unwrap()
        .unwrap();
    let pulled = pull_timestamps(&mut cursor);

    assert_eq!(pulled, vec![vec![20, 90], vec![95]]);
}

#[test]
fn reject_all_predicate_is_present_but_empty() {
    let gauge = new_gauge();
    let shards: Vec<Arc<dyn Shard>> = vec![
        MemShard::floats(1, vec![float_batch(&[(10, 1.0)])], &gauge),
        MemShard::floats(2, vec![float_batch(&[(20, 2.0)])], &gauge),
    ];

    let cursor =
        build_multi_shard_cursor(request(), shards, Some(Arc::new(RejectAll))).unwrap();
    // a cursor exists - some shard matched - but it reaches end of stream
    // without emitting anything, and every shard cursor gets released
    let mut cursor = cursor.expect("shards matched, cursor must be present");
    assert!(cursor.next_batch().unwrap().is_none());
    assert_eq!(open_now(&gauge), 0);
}

// ============================================================================
// Aggregate over Multi-Shard
// ============================================================================

#[test]
fn count_over_stitched_string_shards() {
    let gauge = new_gauge();
    let shards: Vec<Arc<dyn Shard>> = vec![
        MemShard::strings(
            1,
            vec![string_batch(&[(10, "a"), (20, "b"), (30, "c")])],
            &gauge,
        ),
        MemShard::empty(2, &gauge),
        MemShard::strings(3, vec![string_batch(&[(40, "d"), (50, "e")])], &gauge),
    ];

    let stitched = build_multi_shard_cursor(request(), shards, None).unwrap();
    let mut cursor = build_aggregate_cursor(&Aggregate::count("usage"), stitched)
        .unwrap()
        .unwrap();
    assert_eq!(cursor.value_type(), ValueType::Integer);

    let mut points = Vec::new();
    while let Some(batch) = cursor.next_batch().unwrap() {
        match batch {
            FieldBatch::Integer(batch) => points.push((batch.timestamps[0], batch.values[0])),
            other => panic!("expected integer batch, got {:?}", other.value_type()),
        }
    }

    assert_eq!(points, vec![(30, 3), (50, 2)]);
    assert_eq!(open_now(&gauge), 0);
}

#[test]
fn sum_over_stitched_float_shards() {
    let gauge = new_gauge();
    let shards: Vec<Arc<dyn Shard>> = vec![
        MemShard::floats(1, vec![float_batch(&[(10, 1.5), (20, 2.5)])], &gauge),
        MemShard::floats(2, vec![float_batch(&[(30, 4.0)])], &gauge),
    ];

    let stitched = build_multi_shard_cursor(request(), shards, None).unwrap();
    let mut cursor = build_aggregate_cursor(&Aggregate::sum("usage"), stitched)
        .unwrap()
        .unwrap();
    assert_eq!(cursor.value_type(), ValueType::Float);

    let mut points = Vec::new();
    while let Some(batch) = cursor.next_batch().unwrap() {
        match batch {
            FieldBatch::Float(batch) => points.push((batch.timestamps[0], batch.values[0])),
            other => panic!("expected float batch, got {:?}", other.value_type()),
        }
    }

    assert_eq!(points, vec![(20, 4.0), (30, 4.0)]);
}

#[test]
fn aggregate_over_absent_stitch_is_absent() {
    let gauge = new_gauge();
    let shards: Vec<Arc<dyn Shard>> = vec![MemShard::empty(1, &gauge), MemShard::empty(2, &gauge)];

    let stitched = build_multi_shard_cursor(request(), shards, None).unwrap();
    assert!(stitched.is_none());

    let aggregated = build_aggregate_cursor(&Aggregate::count("usage"), stitched).unwrap();
    assert!(aggregated.is_none());
}

// ============================================================================
// Error Surface
// ============================================================================

#[test]
fn errors_fold_into_the_crate_error() {
    fn read_summed(shards: Vec<Arc<dyn Shard>>) -> strata_tsdb::Result<Option<FieldCursor>> {
        let range = TimeRange::new(0, 100)?;
        let request = request().with_range(range);
        let stitched = build_multi_shard_cursor(request, shards, None)?;
        Ok(build_aggregate_cursor(&Aggregate::sum("usage"), stitched)?)
    }

    let gauge = new_gauge();
    // sum over a string field: the planner-contract violation folds into
    // the crate error as a query error
    let shards: Vec<Arc<dyn Shard>> =
        vec![MemShard::strings(1, vec![string_batch(&[(10, "a")])], &gauge)];
    let err = read_summed(shards).unwrap_err();
    match err {
        strata_tsdb::Error::Query(query_err) => {
            assert_eq!(query_err.kind, strata_tsdb::QueryErrorKind::Internal);
        }
        other => panic!("expected query error, got {other}"),
    }
    // the violating cursor was still released
    assert_eq!(open_now(&gauge), 0);
}
