//! Query error types
//!
//! Structured error handling for the read path. The `kind` field lets
//! callers separate the three outcomes that matter operationally: a request
//! the user got wrong (`ValidationError`), a shard or cursor that failed at
//! runtime (`ExecutionError`), and a broken contract between layers
//! (`Internal`). The last one is never caused by user input; it means an
//! upstream component handed this layer something it promised not to.

use std::fmt;

/// Query error with context
#[derive(Debug)]
pub struct QueryError {
    /// Error kind for programmatic handling
    pub kind: QueryErrorKind,
    /// Human-readable message
    pub message: String,
    /// Optional source error
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl QueryError {
    /// Create a new query error
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Add source error for error chaining
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::ValidationError, message)
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::ExecutionError, message)
    }

    /// Create an internal error
    ///
    /// Reserved for contract violations between layers: an aggregate paired
    /// with a value type it cannot reduce, or a shard producing a cursor of
    /// the wrong type mid-stream. These are bugs in the caller, not
    /// recoverable conditions, and are kept distinguishable from both "no
    /// data" and malformed-query errors so operators can tell them apart.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::Internal, message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Categories of query errors for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Request validation failed (inverted time range, unknown field, etc.)
    ValidationError,
    /// Execution failed at runtime (shard I/O error, decode failure)
    ExecutionError,
    /// Contract violation between layers (bug, not a user error)
    Internal,
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryErrorKind::ValidationError => write!(f, "ValidationError"),
            QueryErrorKind::ExecutionError => write!(f, "ExecutionError"),
            QueryErrorKind::Internal => write!(f, "Internal"),
        }
    }
}

/// Result type alias for query operations
pub type QueryResult<T> = std::result::Result<T, QueryError>;
