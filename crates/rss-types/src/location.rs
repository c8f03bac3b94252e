//! Partition location resolution: where a partition's primary and replica
//! copies live, and what storage medium each one is on.

use crate::ids::PartitionId;

/// Whether a [`PartitionLocation`] is the partition's primary copy or its
/// replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PartitionRole {
    /// Receives a push first; its flush-enqueue outcome is authoritative
    /// for the push's acknowledgement (see `rss-worker`'s push handler).
    Primary,
    /// Receives a replicated copy of every batch the primary accepts.
    Replica,
}

/// The storage medium a partition's file is expected to live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StorageHint {
    /// Held entirely in the worker's buffer pool, never flushed to disk.
    Memory,
    /// Flushed to a local solid-state disk mount.
    Ssd,
    /// Flushed to a local spinning disk mount.
    Hdd,
    /// Flushed to a remote HDFS-compatible filesystem.
    Hdfs,
    /// Flushed to an S3-compatible object store.
    S3,
}

/// A unique handle on one primary-or-replica copy of a partition, distinct
/// from the `(partition_id, epoch)` pair other copies might share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionLocationId {
    /// The partition this location is a copy of.
    pub partition_id: PartitionId,
    /// Incremented every time the partition is split (see the storage
    /// layer's soft/hard split handling).
    pub epoch: u32,
    /// Distinguishes the primary from the replica at a given
    /// `(partition_id, epoch)`.
    pub role: PartitionRole,
}

/// Where a partition's primary or replica copy lives, and how to reach it.
///
/// Mirrors spec.md's `PartitionLocation` tuple directly: host/ports/role
/// plus a `peer_ref` back to the other copy. Peer symmetry (a primary's
/// `peer_ref` points at a replica whose own `peer_ref` points back) is an
/// invariant enforced by the partition location registry, never by a raw
/// pointer cycle in this struct — see `rss-registry`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionLocation {
    /// The partition this location is a copy of.
    pub partition_id: PartitionId,
    /// Incremented every time the partition is split.
    pub epoch: u32,
    /// Hostname or IP address of the worker hosting this copy.
    pub host: String,
    /// Port the worker's control-plane RPC service listens on.
    pub rpc_port: u16,
    /// Port the push handler listens on.
    pub push_port: u16,
    /// Port the fetch/chunk server listens on.
    pub fetch_port: u16,
    /// Port the replication listener (primary -> replica) listens on.
    pub replicate_port: u16,
    /// Whether this copy is the primary or the replica.
    pub role: PartitionRole,
    /// The other copy of the same `(partition_id, epoch)`, if replication
    /// is enabled for this partition.
    pub peer_ref: Option<PartitionLocationId>,
    /// The storage medium this copy's file is expected to live on.
    pub storage_hint: StorageHint,
    /// The local disk mount point backing this copy, when `storage_hint`
    /// names a disk-backed medium.
    pub disk_mount: Option<String>,
}

impl PartitionLocation {
    /// Returns this location's identity as a [`PartitionLocationId`].
    #[must_use]
    pub const fn id(&self) -> PartitionLocationId {
        PartitionLocationId {
            partition_id: self.partition_id,
            epoch: self.epoch,
            role: self.role,
        }
    }

    /// Returns `true` if this location is the partition's primary copy.
    #[must_use]
    pub const fn is_primary(&self) -> bool {
        matches!(self.role, PartitionRole::Primary)
    }
}
