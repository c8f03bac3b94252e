//! Accepts `PushData`/`PushMergedData` requests, writes them to the local
//! partition file, and forks primary pushes to the replica.

use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rss_congestion::{CongestionController, CongestionDecision};
use rss_memory::{BufferPool, MemoryTracker, TrackerState};
use rss_protocol::{Ack, Message, PushData, PushMergedData, PushMode};
use rss_registry::{EpochLocations, PartitionLocationRegistry, RegistryError};
use rss_storage::{ChunkOffsetIndex, DeviceMonitor, DiskFlusher, FileWriter, FileWriterConfig};
use rss_transport::{ConnectionPool, RetryPolicy};
use rss_types::{BatchHeader, MapIdBitmap, PartitionId, PartitionRole, ShuffleId};

/// Static configuration for a [`PushHandler`].
#[derive(Debug, Clone)]
pub struct PushHandlerConfig {
    /// Root directory under which each configured mount's files are
    /// written.
    pub base_dir: PathBuf,
    /// Tuning passed through to every [`FileWriter`] this handler creates.
    pub writer: FileWriterConfig,
    /// How long a replica forward waits for an ack before the retry policy
    /// decides whether to try again.
    pub push_data_timeout: Duration,
    /// Backoff schedule for replica forwarding retries.
    pub replica_retry: RetryPolicy,
    /// Disk flusher queue depth, shared by every mount's flusher.
    pub flusher_queue_capacity: usize,
    /// Number of flusher worker threads per mount.
    pub flusher_threads: usize,
    /// Flush wall-clock time above which a mount is reported to the device
    /// monitor.
    pub slow_flush_threshold: Duration,
}

type WriterKey = (PartitionId, u32, PartitionRole);

struct WriterSlot {
    writer: FileWriter,
    file: Arc<Mutex<File>>,
    file_name: String,
    map_ids: MapIdBitmap,
}

/// Receives pushes addressed to this worker, writes them through a
/// [`FileWriter`], and forwards primary pushes to the partition's replica.
///
/// A closed partition or a stale epoch is rejected before any write is
/// attempted; congestion and memory-pressure state are checked next; only
/// then is the batch written. The ack for a primary push is released once
/// the local write is enqueued and the replica's ack (if any) has
/// returned — a primary flush failure that surfaces later does not retract
/// an ack already sent (see `DESIGN.md`).
pub struct PushHandler {
    registry: Arc<PartitionLocationRegistry>,
    pool: BufferPool,
    flushers: DashMap<PathBuf, Arc<DiskFlusher>>,
    device_monitor: Arc<DeviceMonitor>,
    congestion: Arc<CongestionController>,
    memory: Arc<MemoryTracker>,
    replica_pool: Arc<ConnectionPool>,
    writers: DashMap<WriterKey, Arc<Mutex<WriterSlot>>>,
    creation_lock: Mutex<()>,
    indices: Arc<DashMap<String, ChunkOffsetIndex>>,
    map_bitmaps: Arc<DashMap<String, MapIdBitmap>>,
    config: PushHandlerConfig,
}

impl PushHandler {
    /// Creates a handler sharing `registry`, `pool`, `device_monitor`,
    /// `congestion`, and `memory` with the rest of the worker, and
    /// populating `indices` and `map_bitmaps` as writers close.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<PartitionLocationRegistry>,
        pool: BufferPool,
        device_monitor: Arc<DeviceMonitor>,
        congestion: Arc<CongestionController>,
        memory: Arc<MemoryTracker>,
        replica_pool: Arc<ConnectionPool>,
        indices: Arc<DashMap<String, ChunkOffsetIndex>>,
        map_bitmaps: Arc<DashMap<String, MapIdBitmap>>,
        config: PushHandlerConfig,
    ) -> Self {
        Self {
            registry,
            pool,
            flushers: DashMap::new(),
            device_monitor,
            congestion,
            memory,
            replica_pool,
            writers: DashMap::new(),
            creation_lock: Mutex::new(()),
            indices,
            map_bitmaps,
            config,
        }
    }

    /// Handles a single-batch push, writing it locally and, for a primary
    /// push with a configured replica, forwarding it before acking.
    pub async fn handle_push_data(&self, shuffle_id: &ShuffleId, request: PushData) -> Ack {
        let partition_id = request.partition_location_id;
        let role = PartitionRole::for_mode(request.mode);

        let (resolved, mount) = match self.accept(shuffle_id, partition_id, request.epoch, role) {
            Ok(accepted) => accepted,
            Err(ack) => return ack,
        };

        let mut framed = Vec::with_capacity(rss_types::wire::HEADER_LEN + request.body.len());
        framed.extend_from_slice(&request.header.to_bytes());
        framed.extend_from_slice(&request.body);

        let split = match self.write_local(
            partition_id,
            request.epoch,
            role,
            &mount,
            &[(request.header.map_id, framed.as_slice())],
        ) {
            Ok(split) => split,
            Err(_) => return fail_ack(role),
        };

        self.congestion
            .record_produced(&shuffle_id.app_id, request.body.len() as u64, Instant::now());

        if matches!(request.mode, PushMode::Replica) {
            return split_ack(split).unwrap_or(Ack::Success);
        }

        if let Some(replica) = resolved.replica.as_ref() {
            let endpoint = format!("{}:{}", replica.host, replica.push_port);
            let mut forwarded = request;
            forwarded.mode = PushMode::Replica;
            match self.forward_to_replica(&endpoint, Message::PushData(forwarded)).await {
                Ok(Ack::Success) => {}
                Ok(_) | Err(_) => return Ack::PushDataFailReplica,
            }
        }

        split_ack(split).unwrap_or(Ack::Success)
    }

    /// Handles a merged push (several batches sharing one endpoint),
    /// applying the same decision table as [`PushHandler::handle_push_data`]
    /// but writing each batch under its own header rather than collapsing
    /// them into one framed blob.
    pub async fn handle_push_merged_data(&self, shuffle_id: &ShuffleId, request: PushMergedData) -> Ack {
        let partition_id = request.partition_location_id;
        let role = PartitionRole::for_mode(request.mode);

        let (resolved, mount) = match self.accept(shuffle_id, partition_id, request.epoch, role) {
            Ok(accepted) => accepted,
            Err(ack) => return ack,
        };

        let frames = framed_batches(&request.headers, &request.offsets, &request.body);
        let frame_refs: Vec<(u32, &[u8])> = frames
            .iter()
            .zip(&request.headers)
            .map(|(frame, header)| (header.map_id, frame.as_slice()))
            .collect();
        let split = match self.write_local(partition_id, request.epoch, role, &mount, &frame_refs) {
            Ok(split) => split,
            Err(_) => return fail_ack(role),
        };

        self.congestion
            .record_produced(&shuffle_id.app_id, request.body.len() as u64, Instant::now());

        if matches!(request.mode, PushMode::Replica) {
            return split_ack(split).unwrap_or(Ack::Success);
        }

        if let Some(replica) = resolved.replica.as_ref() {
            let endpoint = format!("{}:{}", replica.host, replica.push_port);
            let mut forwarded = request;
            forwarded.mode = PushMode::Replica;
            match self.forward_to_replica(&endpoint, Message::PushMergedData(forwarded)).await {
                Ok(Ack::Success) => {}
                Ok(_) | Err(_) => return Ack::PushDataFailReplica,
            }
        }

        split_ack(split).unwrap_or(Ack::Success)
    }

    /// Applies the closed-partition, stale-epoch, congestion, and
    /// memory-pressure checks shared by [`PushHandler::handle_push_data`]
    /// and [`PushHandler::handle_push_merged_data`], returning the
    /// resolved locations and the disk mount to write to, or the `Ack` to
    /// reject the request with.
    fn accept(
        &self,
        shuffle_id: &ShuffleId,
        partition_id: PartitionId,
        epoch: u32,
        role: PartitionRole,
    ) -> Result<(EpochLocations, String), Ack> {
        if self.registry.is_closed(shuffle_id, partition_id) {
            return Err(Ack::StageEnd);
        }

        let resolved = match self.registry.resolve(shuffle_id, partition_id, epoch) {
            Ok(resolved) => resolved,
            Err(RegistryError::StaleEpoch { current, requested, .. }) => {
                return Err(if requested < current { Ack::HardSplit } else { Ack::StageEnd });
            }
            Err(_) => return Err(Ack::StageEnd),
        };

        if let CongestionDecision::Throttle { .. } = self.congestion.decision(&shuffle_id.app_id) {
            return Err(Ack::CongestControl);
        }
        if matches!(self.memory.state(), TrackerState::PausePush) {
            return Err(Ack::PausePush);
        }

        let location = match role {
            PartitionRole::Primary => &resolved.primary,
            PartitionRole::Replica => match resolved.replica.as_ref() {
                Some(replica) => replica,
                None => return Err(Ack::PushDataFailReplica),
            },
        };
        let Some(mount) = location.disk_mount.clone() else {
            return Err(fail_ack(role));
        };

        Ok((resolved, mount))
    }

    /// Writes each of `frames` (`map_id`, already header-framed bytes) to
    /// the partition's file in order, returning the most recent split
    /// request observed, if any, and recording each `map_id` in the
    /// writer's bitmap so the fetch server can later skip this file for a
    /// disjoint map-id range.
    fn write_local(
        &self,
        partition_id: PartitionId,
        epoch: u32,
        role: PartitionRole,
        mount: &str,
        frames: &[(u32, &[u8])],
    ) -> Result<Option<rss_storage::SplitRequest>, rss_storage::StorageError> {
        let mount_path = self.config.base_dir.join(mount);
        let flusher = self.flusher_for(&mount_path);
        let slot = self.slot_for(partition_id, epoch, role, &mount_path, &flusher)?;

        let mut guard = slot.lock().expect("writer slot mutex poisoned");
        let file = guard.file.clone();
        let mut split = None;
        for &(map_id, frame) in frames {
            if let Some(observed) = guard.writer.write(&file, frame)? {
                split = Some(observed);
            }
            guard.map_ids.insert(map_id);
        }
        Ok(split)
    }

    fn flusher_for(&self, mount_path: &std::path::Path) -> Arc<DiskFlusher> {
        self.flushers
            .entry(mount_path.to_path_buf())
            .or_insert_with(|| {
                Arc::new(DiskFlusher::new(
                    mount_path.to_path_buf(),
                    self.config.flusher_queue_capacity,
                    self.config.flusher_threads,
                    self.config.slow_flush_threshold,
                    self.device_monitor.clone(),
                ))
            })
            .clone()
    }

    fn slot_for(
        &self,
        partition_id: PartitionId,
        epoch: u32,
        role: PartitionRole,
        mount_path: &std::path::Path,
        flusher: &Arc<DiskFlusher>,
    ) -> Result<Arc<Mutex<WriterSlot>>, rss_storage::StorageError> {
        let key = (partition_id, epoch, role);
        if let Some(slot) = self.writers.get(&key) {
            return Ok(slot.clone());
        }

        let _guard = self.creation_lock.lock().expect("creation lock poisoned");
        if let Some(slot) = self.writers.get(&key) {
            return Ok(slot.clone());
        }

        let role_byte = match role {
            PartitionRole::Primary => 'p',
            PartitionRole::Replica => 'r',
        };
        let file_name = format!("{partition_id}-{epoch}-{role_byte}");
        std::fs::create_dir_all(mount_path).map_err(|source| rss_storage::StorageError::Io {
            path: mount_path.display().to_string(),
            source,
        })?;
        let path = mount_path.join(&file_name);
        let writer = FileWriter::create(&path, flusher.clone(), self.pool.clone(), self.config.writer)?;
        let file = Arc::new(Mutex::new(std::fs::OpenOptions::new().append(true).open(&path).map_err(
            |source| rss_storage::StorageError::Io {
                path: path.display().to_string(),
                source,
            },
        )?));
        let slot = Arc::new(Mutex::new(WriterSlot {
            writer,
            file,
            file_name,
            map_ids: MapIdBitmap::new(),
        }));
        self.writers.insert(key, slot.clone());
        Ok(slot)
    }

    /// Finalizes the writer for `(partition_id, epoch, role)`, recording its
    /// chunk-offset index and map-id bitmap for the fetch server and
    /// dropping the writer slot.
    pub fn close_writer(&self, partition_id: PartitionId, epoch: u32, role: PartitionRole) {
        if let Some((_, slot)) = self.writers.remove(&(partition_id, epoch, role)) {
            let mut guard = slot.lock().expect("writer slot mutex poisoned");
            let file = guard.file.clone();
            let index = guard.writer.close(&file);
            self.indices.insert(guard.file_name.clone(), index);
            self.map_bitmaps.insert(guard.file_name.clone(), guard.map_ids.clone());
        }
    }

    async fn forward_to_replica(&self, endpoint: &str, frame: Message) -> Result<Ack, rss_transport::TransportError> {
        let mut attempt = 0;
        loop {
            let attempt_frame = frame.clone();
            let result = self
                .replica_pool
                .with_connection(endpoint, |conn| async move {
                    conn.send(attempt_frame).await?;
                    match conn.recv().await? {
                        Message::Ack(ack) => Ok(ack),
                        _ => Err(rss_transport::TransportError::ClosedMidFrame {
                            endpoint: conn.endpoint().to_string(),
                        }),
                    }
                })
                .await;

            match result {
                Ok(ack) => return Ok(ack),
                Err(err) if self.config.replica_retry.should_retry(attempt) => {
                    tokio::time::sleep(self.config.replica_retry.delay_for(attempt)).await;
                    attempt += 1;
                    let _ = err;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Re-frames each batch in a merged push as `header.to_bytes()` followed by
/// its payload slice, matching the on-disk framing spec.md requires for
/// every batch regardless of whether it arrived alone or merged with
/// others.
fn framed_batches(headers: &[BatchHeader], offsets: &[u32], body: &[u8]) -> Vec<Vec<u8>> {
    headers
        .iter()
        .zip(offsets)
        .map(|(header, &offset)| {
            let start = offset as usize;
            let end = start + header.payload_size as usize;
            let mut frame = Vec::with_capacity(rss_types::wire::HEADER_LEN + header.payload_size as usize);
            frame.extend_from_slice(&header.to_bytes());
            frame.extend_from_slice(&body[start..end]);
            frame
        })
        .collect()
}

fn fail_ack(role: PartitionRole) -> Ack {
    match role {
        PartitionRole::Primary => Ack::PushDataFailPrimary,
        PartitionRole::Replica => Ack::PushDataFailReplica,
    }
}

fn split_ack(split: Option<rss_storage::SplitRequest>) -> Option<Ack> {
    split.map(|s| if s.hard { Ack::HardSplit } else { Ack::SoftSplit })
}

trait ForMode {
    fn for_mode(mode: PushMode) -> Self;
}

impl ForMode for PartitionRole {
    fn for_mode(mode: PushMode) -> Self {
        match mode {
            PushMode::Primary => Self::Primary,
            PushMode::Replica => Self::Replica,
        }
    }
}
