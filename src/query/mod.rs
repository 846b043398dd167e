//! Query-layer plumbing shared by the cursor composition code
//!
//! This module carries the pieces the cursor layer consumes from the query
//! layer rather than owning outright:
//! - Structured errors with a kind for programmatic handling
//! - The opaque value-predicate contract for pushed-down WHERE filters

pub mod error;
pub mod predicate;

pub use error::{QueryError, QueryErrorKind, QueryResult};
pub use predicate::{Predicate, ValuePredicate};
