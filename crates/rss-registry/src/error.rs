//! Errors the partition location registry can raise.

use rss_types::PartitionId;
use thiserror::Error;

/// Errors raised while registering or resolving partition locations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No entry exists for `(shuffle_id, partition_id)`.
    #[error("no registered partition {partition_id} for shuffle {shuffle_id}")]
    UnknownPartition {
        /// The shuffle the caller asked about.
        shuffle_id: String,
        /// The partition the caller asked about.
        partition_id: PartitionId,
    },
    /// The epoch named by the caller is not the current epoch, or has no
    /// registered locations.
    #[error("epoch {requested} is stale for partition {partition_id} (current is {current})")]
    StaleEpoch {
        /// The partition the caller asked about.
        partition_id: PartitionId,
        /// The epoch the caller named.
        requested: u32,
        /// The entry's current epoch.
        current: u32,
    },
    /// A caller tried to register a location under a role that already has
    /// one for that `(partition_id, epoch)`.
    #[error("partition {partition_id} epoch {epoch} already has a {role:?} location")]
    LocationAlreadyRegistered {
        /// The partition the caller tried to register.
        partition_id: PartitionId,
        /// The epoch the caller tried to register under.
        epoch: u32,
        /// The role that was already occupied.
        role: rss_types::PartitionRole,
    },
    /// A caller tried to attach a replica before a primary exists for that
    /// `(partition_id, epoch)`, or vice versa.
    #[error("partition {partition_id} epoch {epoch} has no primary location to pair a replica with")]
    MissingPrimary {
        /// The partition the caller tried to register.
        partition_id: PartitionId,
        /// The epoch the caller tried to register under.
        epoch: u32,
    },
    /// The registry entry for this partition has been closed (stage end);
    /// callers should stop writing and report `StageEnd` upstream.
    #[error("partition {partition_id} for shuffle {shuffle_id} is closed")]
    Closed {
        /// The shuffle the caller asked about.
        shuffle_id: String,
        /// The partition the caller asked about.
        partition_id: PartitionId,
    },
}
