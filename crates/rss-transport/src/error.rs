//! Errors raised while connecting to or exchanging frames with a worker.

use rss_protocol::ProtocolError;
use thiserror::Error;

/// Errors a [`crate::Connection`] or [`crate::ConnectionPool`] can raise.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The TCP connect attempt failed.
    #[error("connecting to {endpoint} failed: {source}")]
    Connect {
        /// The endpoint that refused the connection.
        endpoint: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The peer closed the connection before a full frame arrived.
    #[error("connection to {endpoint} closed mid-frame")]
    ClosedMidFrame {
        /// The endpoint whose connection closed.
        endpoint: String,
    },
    /// An operation exceeded its configured timeout.
    #[error("operation against {endpoint} timed out after {elapsed_ms}ms")]
    Timeout {
        /// The endpoint the operation was in flight to.
        endpoint: String,
        /// How long the operation had been in flight when it timed out.
        elapsed_ms: u64,
    },
    /// A frame failed to encode or decode.
    #[error("protocol error with {endpoint}: {source}")]
    Protocol {
        /// The endpoint the frame was exchanged with.
        endpoint: String,
        /// The underlying protocol error.
        #[source]
        source: ProtocolError,
    },
    /// A read or write on an established connection failed.
    #[error("I/O error with {endpoint}: {source}")]
    Io {
        /// The endpoint the I/O was against.
        endpoint: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    /// Returns `true` if the caller should retry against an alternate
    /// endpoint rather than give up, matching the retry policy
    /// `rss_types::ShuffleError`'s connection and timeout variants imply.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Protocol { .. })
    }
}
