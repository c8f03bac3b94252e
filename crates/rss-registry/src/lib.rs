//! The partition location registry: `(shuffle_id, partition_id, epoch)` to
//! primary/replica endpoint resolution.
//!
//! # Overview
//!
//! Every partition a shuffle writes to has one primary
//! [`PartitionLocation`] and, when replication is enabled, exactly one
//! replica. A split bumps the partition's epoch; the old epoch's locations
//! stay resolvable so in-flight writers can drain while new pushes target
//! the new epoch. Primary/replica cross-references are modeled as
//! indirection through this registry rather than a pointer cycle: each
//! location stores only a [`PartitionLocationId`] naming its peer, and
//! [`PartitionLocationRegistry::attach_replica`] is the single place that
//! establishes the symmetric pair.
//!
//! # Design
//!
//! Entries live in a [`dashmap::DashMap`] keyed by `(ShuffleId,
//! PartitionId)`, matching the lock-free map style already used for the
//! transport layer's connection pool and the worker's in-flight tracker.
//! Each entry carries its own `Arc<AtomicBool>` "closed" flag
//! ([`ClosedFlag`]) that a push handler can clone and poll independently of
//! the registry, so a partition torn down at stage end is observed by
//! holders of a stale reference on their next write instead of causing a
//! lookup to panic.
//!
//! # See also
//!
//! [`rss_types::location`] for the [`PartitionLocation`] tuple this crate
//! indexes. `rss-worker`'s push handler for how [`RegistryError::StaleEpoch`]
//! maps onto `SOFT_SPLIT` / `HARD_SPLIT` / `STAGE_END` acks.

pub mod error;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rss_types::{PartitionId, PartitionLocation, PartitionRole, ShuffleId};

pub use error::RegistryError;

/// A cheaply cloneable handle on one partition entry's closed state.
///
/// Held by in-flight push handlers so they can notice a stage-end teardown
/// on their next write without re-querying the registry.
#[derive(Debug, Clone)]
pub struct ClosedFlag(Arc<AtomicBool>);

impl ClosedFlag {
    /// Returns `true` once the owning registry entry has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// The primary and, if attached, replica location for one
/// `(partition_id, epoch)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochLocations {
    /// The partition's primary copy at this epoch.
    pub primary: PartitionLocation,
    /// The partition's replica copy at this epoch, if replication is
    /// enabled.
    pub replica: Option<PartitionLocation>,
}

#[derive(Default)]
struct EpochSlot {
    primary: Option<PartitionLocation>,
    replica: Option<PartitionLocation>,
}

struct PartitionEntry {
    current_epoch: AtomicU32,
    epochs: std::sync::RwLock<BTreeMap<u32, EpochSlot>>,
    closed: Arc<AtomicBool>,
}

impl PartitionEntry {
    fn new() -> Self {
        Self {
            current_epoch: AtomicU32::new(0),
            epochs: std::sync::RwLock::new(BTreeMap::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Maps `(shuffle_id, partition_id, epoch)` to its primary and replica
/// [`PartitionLocation`]s.
#[derive(Default)]
pub struct PartitionLocationRegistry {
    entries: DashMap<(ShuffleId, PartitionId), Arc<PartitionEntry>>,
}

impl PartitionLocationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    fn entry(&self, shuffle_id: &ShuffleId, partition_id: PartitionId) -> Arc<PartitionEntry> {
        self.entries
            .entry((shuffle_id.clone(), partition_id))
            .or_insert_with(|| Arc::new(PartitionEntry::new()))
            .clone()
    }

    fn existing(&self, shuffle_id: &ShuffleId, partition_id: PartitionId) -> Result<Arc<PartitionEntry>, RegistryError> {
        self.entries
            .get(&(shuffle_id.clone(), partition_id))
            .map(|e| e.clone())
            .ok_or_else(|| RegistryError::UnknownPartition {
                shuffle_id: shuffle_id.to_string(),
                partition_id,
            })
    }

    /// Registers `location` (which must have [`PartitionRole::Primary`]) as
    /// the primary copy for `(partition_id, epoch)`, creating the entry if
    /// this is the partition's first registration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LocationAlreadyRegistered`] if a primary is
    /// already registered for that epoch.
    pub fn register_primary(
        &self,
        shuffle_id: &ShuffleId,
        partition_id: PartitionId,
        epoch: u32,
        location: PartitionLocation,
    ) -> Result<(), RegistryError> {
        debug_assert_eq!(location.role, PartitionRole::Primary);
        let entry = self.entry(shuffle_id, partition_id);
        let mut epochs = entry.epochs.write().expect("epochs lock poisoned");
        let slot = epochs.entry(epoch).or_default();
        if slot.primary.is_some() {
            return Err(RegistryError::LocationAlreadyRegistered {
                partition_id,
                epoch,
                role: PartitionRole::Primary,
            });
        }
        slot.primary = Some(location);
        drop(epochs);
        entry.current_epoch.fetch_max(epoch, Ordering::AcqRel);
        Ok(())
    }

    /// Attaches `location` (which must have [`PartitionRole::Replica`]) as
    /// the replica for `(partition_id, epoch)`, and establishes the
    /// symmetric `peer_ref` pair between primary and replica.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MissingPrimary`] if no primary is
    /// registered yet for that epoch, or
    /// [`RegistryError::LocationAlreadyRegistered`] if a replica already is.
    pub fn attach_replica(
        &self,
        shuffle_id: &ShuffleId,
        partition_id: PartitionId,
        epoch: u32,
        mut location: PartitionLocation,
    ) -> Result<(), RegistryError> {
        debug_assert_eq!(location.role, PartitionRole::Replica);
        let entry = self.existing(shuffle_id, partition_id)?;
        let mut epochs = entry.epochs.write().expect("epochs lock poisoned");
        let slot = epochs.get_mut(&epoch).ok_or(RegistryError::MissingPrimary { partition_id, epoch })?;
        let primary = slot.primary.as_mut().ok_or(RegistryError::MissingPrimary { partition_id, epoch })?;
        if slot.replica.is_some() {
            return Err(RegistryError::LocationAlreadyRegistered {
                partition_id,
                epoch,
                role: PartitionRole::Replica,
            });
        }
        location.peer_ref = Some(primary.id());
        primary.peer_ref = Some(location.id());
        slot.replica = Some(location);
        Ok(())
    }

    /// Resolves the primary (and replica, if attached) location for
    /// `(partition_id, epoch)`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownPartition`] if the partition was
    /// never registered, or [`RegistryError::StaleEpoch`] if `epoch` has no
    /// registered primary (already pruned, or not yet created by a split).
    pub fn resolve(&self, shuffle_id: &ShuffleId, partition_id: PartitionId, epoch: u32) -> Result<EpochLocations, RegistryError> {
        let entry = self.existing(shuffle_id, partition_id)?;
        let epochs = entry.epochs.read().expect("epochs lock poisoned");
        let slot = epochs.get(&epoch);
        let primary = slot.and_then(|s| s.primary.clone()).ok_or_else(|| RegistryError::StaleEpoch {
            partition_id,
            requested: epoch,
            current: entry.current_epoch.load(Ordering::Acquire),
        })?;
        let replica = slot.and_then(|s| s.replica.clone());
        Ok(EpochLocations { primary, replica })
    }

    /// The highest epoch registered for `(partition_id)`, i.e. the epoch
    /// new pushes should target.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownPartition`] if never registered.
    pub fn current_epoch(&self, shuffle_id: &ShuffleId, partition_id: PartitionId) -> Result<u32, RegistryError> {
        Ok(self.existing(shuffle_id, partition_id)?.current_epoch.load(Ordering::Acquire))
    }

    /// Bumps `(partition_id)`'s current epoch by one and returns the new
    /// value, following a soft or hard split. The caller is responsible
    /// for registering a primary (and replica) location under the
    /// returned epoch.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownPartition`] if never registered.
    pub fn split(&self, shuffle_id: &ShuffleId, partition_id: PartitionId) -> Result<u32, RegistryError> {
        let entry = self.existing(shuffle_id, partition_id)?;
        Ok(entry.current_epoch.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Returns a cloneable handle on `(partition_id)`'s closed flag, for a
    /// push handler to hold across the lifetime of a connection.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownPartition`] if never registered.
    pub fn closed_flag(&self, shuffle_id: &ShuffleId, partition_id: PartitionId) -> Result<ClosedFlag, RegistryError> {
        Ok(ClosedFlag(self.existing(shuffle_id, partition_id)?.closed.clone()))
    }

    /// Marks `(partition_id)` closed (stage end); every [`ClosedFlag`]
    /// handle already cloned out of this registry observes the change on
    /// its next poll.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownPartition`] if never registered.
    pub fn close(&self, shuffle_id: &ShuffleId, partition_id: PartitionId) -> Result<(), RegistryError> {
        self.existing(shuffle_id, partition_id)?.closed.store(true, Ordering::Release);
        Ok(())
    }

    /// Returns `true` if `(partition_id)` has been closed. Unregistered
    /// partitions are reported as not closed; callers distinguish
    /// "unknown" from "closed" via [`PartitionLocationRegistry::resolve`].
    #[must_use]
    pub fn is_closed(&self, shuffle_id: &ShuffleId, partition_id: PartitionId) -> bool {
        self.entries
            .get(&(shuffle_id.clone(), partition_id))
            .is_some_and(|e| e.closed.load(Ordering::Acquire))
    }
}
