//! Error types for rate limit evaluation.

use thiserror::Error;

/// Main error type for rate limiting operations.
#[derive(Error, Debug)]
pub enum RateLimitError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A declared policy has a non-positive limit or period
    #[error("Malformed rate limit policy for {key}: {reason}")]
    MalformedPolicy { key: String, reason: String },

    /// The counter store failed while evaluating a request
    #[error("Counter store failed for {key}: {source}")]
    Store {
        key: String,
        #[source]
        source: StoreError,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RateLimitError {
    /// Whether this error means the counter medium could not be reached.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            RateLimitError::Store {
                source: StoreError::Unavailable(_),
                ..
            }
        )
    }
}

/// Errors surfaced by [`CounterStore`](crate::ratelimit::CounterStore) implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing medium cannot be read or written right now
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    /// `increment` was called for a key that has no counter
    #[error("no counter exists for key {0}")]
    MissingCounter(String),
}

/// Result type alias for rate limiting operations.
pub type Result<T> = std::result::Result<T, RateLimitError>;

/// Result type alias for counter store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
