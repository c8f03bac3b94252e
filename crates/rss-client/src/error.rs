//! Error taxonomies for the data pusher and the input stream.

use thiserror::Error;

/// Errors a [`crate::pusher::DataPusher`] can report against a pushed batch.
///
/// Mirrors spec.md's error-handling table (`PUSH_DATA_*` kinds) for the
/// subset a client observes directly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PusherError {
    /// The primary's local write failed.
    #[error("push data write failed on primary at {endpoint}")]
    WriteFailPrimary {
        /// The endpoint that rejected the push.
        endpoint: String,
    },
    /// The replica's write failed after the worker's own retries.
    #[error("push data write failed on replica at {endpoint}")]
    WriteFailReplica {
        /// The endpoint that rejected the push.
        endpoint: String,
    },
    /// The TCP connection to the destination failed or reset.
    #[error("connection to {endpoint} failed")]
    ConnectionFail {
        /// The endpoint that could not be reached.
        endpoint: String,
    },
    /// The batch sat in-flight longer than `push_data_timeout`.
    #[error("push to {endpoint} timed out")]
    Timeout {
        /// The endpoint the batch was in flight to.
        endpoint: String,
    },
    /// The destination rejected the push due to congestion control.
    #[error("push to {endpoint} rejected: congestion control")]
    CongestControl {
        /// The endpoint that throttled the push.
        endpoint: String,
    },
    /// The partition crossed its soft split threshold.
    #[error("partition at {endpoint} soft split")]
    SoftSplit {
        /// The endpoint that returned the split.
        endpoint: String,
    },
    /// The partition crossed its hard split threshold.
    #[error("partition at {endpoint} hard split")]
    HardSplit {
        /// The endpoint that returned the split.
        endpoint: String,
    },
    /// The partition's stage has already ended.
    #[error("partition at {endpoint} stage ended")]
    StageEnd {
        /// The endpoint that returned the stage-end ack.
        endpoint: String,
    },
}

impl PusherError {
    /// Returns `true` for the two kinds spec.md groups under "retry same
    /// pair, alternate replica on even retries": connection failure and
    /// timeout.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionFail { .. } | Self::Timeout { .. })
    }
}

/// Errors an [`crate::input_stream::InputStream`] can surface to its
/// caller.
#[derive(Debug, Error)]
pub enum InputStreamError {
    /// Every location for this partition (and its replica, where present)
    /// failed after `fetch_max_retry` attempts.
    #[error("fetch failed for partition after exhausting retries")]
    FetchFail,
    /// Both the primary and replica locations were unreachable.
    #[error("both primary and replica are unavailable")]
    ReplicaUnavailable,
    /// The aggregated digest over delivered bytes did not match the
    /// aggregated `CommitMetadata` recorded by the map tasks.
    #[error("integrity check failed: {0}")]
    IntegrityMismatch(#[source] rss_checksums::ChecksumError),
    /// A map attempt's `CommitMetadata` was never observed, so the
    /// aggregated digest cannot be trusted even though no mismatch fired.
    #[error("integrity check incomplete: missing commit metadata for map {map_id} attempt {attempt_id}")]
    IntegrityIncomplete {
        /// The map task whose commit metadata never arrived.
        map_id: u32,
        /// The attempt that was expected to produce it.
        attempt_id: u32,
    },
    /// A batch payload failed to decompress.
    #[error("failed to decompress batch payload")]
    Decompress(#[source] std::io::Error),
    /// The configured compression algorithm is unavailable in this build.
    #[error("compression algorithm unavailable")]
    UnsupportedCompression(#[source] std::io::Error),
    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] rss_transport::TransportError),
}
