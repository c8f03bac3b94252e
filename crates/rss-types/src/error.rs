//! The shuffle-wide error taxonomy other crates' error types convert into
//! or wrap; see spec.md's error handling design for the policy each kind
//! implies for the caller.

use thiserror::Error;

/// Errors a producer, a worker, or a consumer can observe while pushing,
/// storing, or fetching shuffle data.
///
/// Every variant documents the retry policy a caller is expected to follow;
/// see the crate-level note on propagation for how writers and flushers
/// surface the first error they hit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShuffleError {
    /// The primary's flusher rejected a write or hit a disk error.
    ///
    /// The producer retries with a new epoch and excludes the failed
    /// worker from subsequent attempts.
    #[error("primary write failed for partition {partition_id} epoch {epoch}")]
    PushDataWriteFailPrimary {
        /// The partition whose primary write failed.
        partition_id: u32,
        /// The epoch active at the time of the failure.
        epoch: u32,
    },
    /// The replica's flusher rejected a write or hit a disk error.
    ///
    /// Same retry policy as [`Self::PushDataWriteFailPrimary`].
    #[error("replica write failed for partition {partition_id} epoch {epoch}")]
    PushDataWriteFailReplica {
        /// The partition whose replica write failed.
        partition_id: u32,
        /// The epoch active at the time of the failure.
        epoch: u32,
    },
    /// A TCP connect attempt or an established connection reset.
    ///
    /// The producer retries against the peer replica and excludes the
    /// failed endpoint.
    #[error("connection to {endpoint} failed")]
    PushDataConnectionFail {
        /// The worker endpoint the producer failed to reach.
        endpoint: String,
    },
    /// An in-flight push exceeded the configured timeout.
    ///
    /// Same retry policy as [`Self::PushDataConnectionFail`].
    #[error("push to {endpoint} timed out after {elapsed_ms}ms")]
    PushDataTimeout {
        /// The worker endpoint the push was in flight to.
        endpoint: String,
        /// How long the push had been in flight when it timed out.
        elapsed_ms: u64,
    },
    /// The producer's user or the worker as a whole is rate-capped.
    ///
    /// The producer backs off and retries the same location.
    #[error("congestion control: retry after {delay_ms}ms")]
    PushDataCongestControl {
        /// How long the producer should wait before retrying.
        delay_ms: u64,
    },
    /// A partition exceeded its soft split threshold.
    ///
    /// The producer requests a new epoch; the old epoch continues
    /// accepting in-flight writes until it drains.
    #[error("partition {partition_id} exceeded its soft split threshold at epoch {epoch}")]
    SoftSplit {
        /// The partition that triggered the split.
        partition_id: u32,
        /// The epoch the split was triggered from.
        epoch: u32,
    },
    /// A partition exceeded its hard split threshold.
    ///
    /// Same retry policy as [`Self::SoftSplit`], but the old epoch stops
    /// accepting new writes immediately rather than draining.
    #[error("partition {partition_id} exceeded its hard split threshold at epoch {epoch}")]
    HardSplit {
        /// The partition that triggered the split.
        partition_id: u32,
        /// The epoch the split was triggered from.
        epoch: u32,
    },
    /// The registry has closed this partition for further writes.
    ///
    /// The producer terminates its map task cleanly; this is not a
    /// failure.
    #[error("partition {partition_id} stage has ended")]
    StageEnd {
        /// The partition whose stage ended.
        partition_id: u32,
    },
    /// The reader could not read a partition after exhausting its retries.
    ///
    /// Surfaced to the compute framework to trigger a stage retry.
    #[error("fetch failed for partition {partition_id} after {attempts} attempts: {reason}")]
    FetchFail {
        /// The partition the fetch failed for.
        partition_id: u32,
        /// How many attempts were made before giving up.
        attempts: u32,
        /// A human-readable summary of the underlying failure.
        reason: String,
    },
    /// The aggregated digest recomputed while reading did not match the
    /// digest recorded while writing.
    ///
    /// Surfaced as a [`Self::FetchFail`] to the consumer; the job fails
    /// fast rather than retrying, since the data is presumed corrupt
    /// rather than transiently unavailable.
    #[error("integrity mismatch for partition {partition_id}: expected crc32c {expected:#010x}, got {actual:#010x}")]
    IntegrityMismatch {
        /// The partition whose digest did not match.
        partition_id: u32,
        /// The digest recorded at write time.
        expected: u32,
        /// The digest recomputed while reading.
        actual: u32,
    },
    /// Fewer bytes were read back than the write-time digest recorded.
    ///
    /// Same fail-fast policy as [`Self::IntegrityMismatch`].
    #[error("integrity incomplete for partition {partition_id}: expected {expected_bytes} bytes, read {actual_bytes} bytes")]
    IntegrityIncomplete {
        /// The partition that was read incompletely.
        partition_id: u32,
        /// The byte count recorded at write time.
        expected_bytes: u64,
        /// The byte count actually read.
        actual_bytes: u64,
    },
    /// The worker has no free push slots for this request.
    ///
    /// The caller retries with backoff, up to a configured attempt limit.
    #[error("worker busy: no push slots available")]
    WorkerBusy,
    /// The worker has no free buffer slots for this request.
    ///
    /// Same retry policy as [`Self::WorkerBusy`].
    #[error("no buffer slots available")]
    SlotsUnavailable,
    /// Both the primary and the replica for a partition are unreachable.
    ///
    /// Surfaced as a [`Self::FetchFail`] to the consumer.
    #[error("both primary and replica are unavailable for partition {partition_id}")]
    ReplicaUnavailable {
        /// The partition neither copy could serve.
        partition_id: u32,
    },
}

impl ShuffleError {
    /// Returns `true` if a producer may retry this error against the same
    /// or an alternate location, as opposed to an error that must
    /// propagate to the caller (integrity failures, stage end).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::StageEnd { .. }
                | Self::IntegrityMismatch { .. }
                | Self::IntegrityIncomplete { .. }
                | Self::FetchFail { .. }
        )
    }
}
