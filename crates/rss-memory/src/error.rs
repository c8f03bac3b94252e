//! Errors raised acquiring a pooled buffer.

use thiserror::Error;

/// Errors [`crate::BufferPool::acquire`] can raise.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// No buffer became free within the requested timeout.
    #[error("no buffer available within {waited_ms}ms")]
    BufferExhausted {
        /// How long the caller waited before giving up.
        waited_ms: u64,
    },
}
