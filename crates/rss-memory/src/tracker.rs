//! The process-wide direct-memory gauge and its pause/resume signal.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

/// The three counters the tracker aggregates, matching spec.md's data
/// model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// Bytes held in netty-style direct buffers (the buffer pool).
    NettyDirect,
    /// Bytes queued in the disk flusher's in-flight writes.
    DiskBufferInFlight,
    /// Bytes held by in-memory sort/merge buffers.
    SortMemory,
}

/// The tracker's current back-pressure state, published on a
/// [`watch::Receiver`] and updated edge-triggered: a send only occurs when
/// the state actually changes, so listeners never observe a duplicate
/// signal for the same condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// Usage is below every threshold; pushes and replication proceed.
    Normal,
    /// Usage exceeded `pause_push_ratio`; handlers refuse new pushes.
    PausePush,
    /// Usage exceeded `pause_replicate_ratio`; handlers also stop forking
    /// to replicas.
    PauseReplicate,
}

/// Configuration for a [`MemoryTracker`].
#[derive(Debug, Clone, Copy)]
pub struct MemoryTrackerConfig {
    /// The direct-memory budget, in bytes.
    pub max_bytes: u64,
    /// Usage-over-max ratio above which `PAUSE_PUSH` is emitted.
    pub pause_push_ratio: f64,
    /// Usage-over-max ratio above which `PAUSE_REPLICATE` is also emitted.
    pub pause_replicate_ratio: f64,
    /// Usage-over-max ratio below which a paused tracker resumes.
    pub resume_ratio: f64,
}

impl Default for MemoryTrackerConfig {
    fn default() -> Self {
        Self {
            max_bytes: 1024 * 1024 * 1024,
            pause_push_ratio: 0.9,
            pause_replicate_ratio: 0.95,
            resume_ratio: 0.7,
        }
    }
}

/// Aggregates [`MemoryKind`]'s three counters and evaluates the pause and
/// resume thresholds on every accounting change.
pub struct MemoryTracker {
    config: MemoryTrackerConfig,
    netty_direct: AtomicU64,
    disk_buffer_in_flight: AtomicU64,
    sort_memory: AtomicU64,
    state_tx: watch::Sender<TrackerState>,
}

impl MemoryTracker {
    /// Creates a tracker starting at zero usage in [`TrackerState::Normal`],
    /// returning it alongside a receiver that observes future state
    /// transitions.
    #[must_use]
    pub fn new(config: MemoryTrackerConfig) -> (Self, watch::Receiver<TrackerState>) {
        let (state_tx, state_rx) = watch::channel(TrackerState::Normal);
        (
            Self {
                config,
                netty_direct: AtomicU64::new(0),
                disk_buffer_in_flight: AtomicU64::new(0),
                sort_memory: AtomicU64::new(0),
                state_tx,
            },
            state_rx,
        )
    }

    /// Adds `bytes` to `kind`'s counter and re-evaluates thresholds.
    pub fn add(&self, kind: MemoryKind, bytes: u64) {
        self.counter(kind).fetch_add(bytes, Ordering::AcqRel);
        self.evaluate();
    }

    /// Subtracts `bytes` from `kind`'s counter and re-evaluates thresholds.
    pub fn release(&self, kind: MemoryKind, bytes: u64) {
        self.counter(kind).fetch_sub(bytes, Ordering::AcqRel);
        self.evaluate();
    }

    /// The tracker's current state.
    #[must_use]
    pub fn state(&self) -> TrackerState {
        *self.state_tx.borrow()
    }

    /// Total bytes tracked across all three counters.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.netty_direct.load(Ordering::Acquire)
            + self.disk_buffer_in_flight.load(Ordering::Acquire)
            + self.sort_memory.load(Ordering::Acquire)
    }

    fn counter(&self, kind: MemoryKind) -> &AtomicU64 {
        match kind {
            MemoryKind::NettyDirect => &self.netty_direct,
            MemoryKind::DiskBufferInFlight => &self.disk_buffer_in_flight,
            MemoryKind::SortMemory => &self.sort_memory,
        }
    }

    fn evaluate(&self) {
        let ratio = self.total_bytes() as f64 / self.config.max_bytes as f64;
        self.state_tx.send_if_modified(|state| {
            let next = if ratio > self.config.pause_replicate_ratio {
                TrackerState::PauseReplicate
            } else if ratio > self.config.pause_push_ratio {
                TrackerState::PausePush
            } else if ratio < self.config.resume_ratio {
                TrackerState::Normal
            } else {
                *state
            };
            if next == *state {
                false
            } else {
                *state = next;
                true
            }
        });
    }
}
