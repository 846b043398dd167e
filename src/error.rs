//! Error types for the read path

use thiserror::Error;

use crate::query::error::QueryError;
use crate::shard::ShardId;

/// Main error type for the read path
#[derive(Error, Debug)]
pub enum Error {
    /// Shard access error
    #[error("Shard error: {0}")]
    Shard(#[from] ShardError),

    /// Query error
    #[error("Query error: {0}")]
    Query(#[from] QueryError),
}

/// Shard access errors
///
/// Raised by a shard when cursor creation fails outright, as opposed to the
/// shard simply holding no matching data. The stitcher skips a shard that
/// returns one of these; it never retries.
#[derive(Error, Debug)]
pub enum ShardError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shard is not accepting reads
    #[error("Shard {shard_id} unavailable: {reason}")]
    Unavailable {
        /// The shard that refused the request
        shard_id: ShardId,
        /// Why the shard refused
        reason: String,
    },

    /// On-disk data failed validation
    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
