//! Typed error taxonomy for the retrieval engine.
//!
//! Four classes of trouble, only two of which surface as `Err`:
//!
//! - **Input errors** (malformed custom dates, inverted ranges) fail the
//!   request synchronously with no partial results.
//! - **Store errors** propagate to the caller as retrievable failures; the
//!   engine performs no retries of its own.
//! - Embedding-collaborator failure is *not* an error: it triggers the
//!   keyword fallback and a degraded marker on the response.
//! - An empty result set is *not* an error: it produces the structured
//!   no-results answer.
//!
//! Nothing in this crate uses panics or exceptions for control flow.

use thiserror::Error;

/// Errors surfaced by [`FragmentStore`](crate::store::FragmentStore)
/// implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The draft violated a store invariant (e.g. empty text).
    #[error("invalid fragment draft: {0}")]
    InvalidDraft(String),

    /// No fragment with the given id exists for this owner.
    #[error("fragment not found: {0}")]
    NotFound(String),

    /// The underlying backend is unreachable or misbehaving.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failure of the embedding collaborator.
///
/// Always treated as "no embedding available" by the engine, never as a
/// fatal error.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding service unavailable: {0}")]
    Unavailable(String),
}

/// Request-level errors returned from the retrieval pipeline.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// A custom time-range date string did not parse as `YYYY-MM-DD`.
    #[error("invalid date {value:?}: expected YYYY-MM-DD")]
    InvalidDate { value: String },

    /// The custom time range is structurally invalid (e.g. start after end).
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    /// The caller-supplied deadline passed before an external call.
    #[error("request cancelled: deadline exceeded")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the crate.
pub type RetrievalResult<T> = Result<T, RetrievalError>;
