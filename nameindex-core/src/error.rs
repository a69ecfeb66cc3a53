//! Error types for nameindex
//!
//! This module defines the error types used throughout the ordered-name
//! index and its collaborator traits.

use thiserror::Error;

/// The main error type for nameindex operations
#[derive(Error, Debug)]
pub enum Error {
    /// An I/O error occurred in a file-backed collaborator implementation
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A caller-supplied value failed boundary validation (e.g. an empty
    /// name, or a non-positive batch size)
    #[error("invalid input: {0}")]
    InvalidName(String),

    /// A SortedBatchStore or SkipList call failed
    ///
    /// Left unretried by design (see the crate's concurrency notes): the
    /// index may be in one of a small set of recoverable intermediate
    /// states after this is returned.
    #[error("backend failure: {0}")]
    BackendFailure(String),

    /// A defensive check caught a broken invariant
    ///
    /// Distinct from `BackendFailure`: this indicates a bug, either in this
    /// crate or in a collaborator implementation, rather than an external
    /// failure. Also returned when a single `ItemList` instance is used
    /// reentrantly.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// A specialized Result type for nameindex operations
pub type Result<T> = std::result::Result<T, Error>;
