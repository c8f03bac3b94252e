//! The per-partition append-only file writer.

use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rss_memory::BufferPool;

use crate::chunk_index::ChunkOffsetIndex;
use crate::error::StorageError;
use crate::flusher::{DiskFlusher, FlushTask};

/// A [`FileWriter`]'s lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Accepting writes normally.
    Accepting,
    /// A hard split has closed this epoch to new writes; draining
    /// in-flight flushes before moving to `Closed`.
    Closing,
    /// Fully closed; `close()` has returned its chunk-offset index.
    Closed,
    /// A flush failed; every subsequent `write()` fails with
    /// [`StorageError::WriterAborted`].
    Aborted,
}

/// Whether a partition exceeding its split threshold keeps accepting
/// writes until the control plane reassigns an epoch, or stops
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    /// Keep accepting pushes to the current epoch while the control plane
    /// catches up.
    Soft,
    /// Stop accepting pushes to the current epoch immediately.
    Hard,
}

/// Emitted once when a writer first crosses `split_threshold`, for the
/// caller to forward to the partition location registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitRequest {
    /// The writer's flushed-plus-buffered size at the moment of the
    /// request.
    pub observed_bytes: u64,
    /// Whether the writer itself has already stopped accepting writes.
    pub hard: bool,
}

/// Tuning knobs for a [`FileWriter`].
#[derive(Debug, Clone, Copy)]
pub struct FileWriterConfig {
    /// In-memory buffer size, in bytes, above which a flush is scheduled.
    pub flush_buffer_size: usize,
    /// Flushed-byte threshold above which [`SplitRequest`] is emitted.
    pub split_threshold: u64,
    /// Soft or hard split behavior once `split_threshold` is crossed.
    pub split_mode: SplitMode,
    /// How long [`FileWriter::close`] waits for in-flight flushes to
    /// finish.
    pub flush_timeout: Duration,
}

impl Default for FileWriterConfig {
    fn default() -> Self {
        Self {
            flush_buffer_size: 256 * 1024,
            split_threshold: 2 * 1024 * 1024 * 1024,
            split_mode: SplitMode::Soft,
            flush_timeout: Duration::from_secs(30),
        }
    }
}

/// A single partition location's append-only file: buffers incoming bytes,
/// schedules flushes once the buffer fills, and accumulates a
/// [`ChunkOffsetIndex`] as flushes complete.
pub struct FileWriter {
    path: PathBuf,
    flusher: Arc<DiskFlusher>,
    pool: BufferPool,
    config: FileWriterConfig,
    current: rss_memory::Acquired,
    pending: VecDeque<mpsc::Receiver<Result<u64, StorageError>>>,
    chunk_index: ChunkOffsetIndex,
    bytes_flushed: u64,
    split_requested: bool,
    state: WriterState,
}

impl FileWriter {
    /// Opens `path` for append and acquires this writer's first in-memory
    /// buffer from `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be created, and
    /// propagates [`rss_memory::MemoryError`] as a [`StorageError::Io`] if
    /// the pool has no buffer free within a short default wait.
    pub fn create(
        path: impl Into<PathBuf>,
        flusher: Arc<DiskFlusher>,
        pool: BufferPool,
        config: FileWriterConfig,
    ) -> Result<Self, StorageError> {
        let path = path.into();
        let _ = Arc::new(Mutex::new(File::create(&path).map_err(|source| StorageError::Io {
            path: path.display().to_string(),
            source,
        })?));
        let current = pool.acquire(Duration::from_secs(1)).map_err(|_| StorageError::Io {
            path: path.display().to_string(),
            source: std::io::Error::other("no buffer available to open writer"),
        })?;
        Ok(Self {
            path,
            flusher,
            pool,
            config,
            current,
            pending: VecDeque::new(),
            chunk_index: ChunkOffsetIndex::new(),
            bytes_flushed: 0,
            split_requested: false,
            state: WriterState::Accepting,
        })
    }

    /// The file path this writer owns.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// This writer's current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Bytes flushed to disk so far; excludes bytes still buffered
    /// in-memory.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes_flushed
    }

    /// Appends `bytes` to the in-memory buffer, scheduling a flush once it
    /// fills, and returns a [`SplitRequest`] the first time flushed-plus-
    /// buffered size crosses `split_threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriterAborted`] if a prior flush failed, or
    /// [`StorageError::FlusherBackPressure`] if the flusher's queue stays
    /// full past `flush_timeout`.
    pub fn write(&mut self, file: &Arc<Mutex<File>>, bytes: &[u8]) -> Result<Option<SplitRequest>, StorageError> {
        self.reap_completed_flushes()?;
        if self.state != WriterState::Accepting {
            return Err(StorageError::WriterAborted {
                path: self.path.display().to_string(),
            });
        }

        let mut offset = 0;
        while offset < bytes.len() {
            let written = self.current.write(&bytes[offset..]);
            offset += written;
            if self.current.len() >= self.config.flush_buffer_size {
                self.schedule_flush(file)?;
            }
            if written == 0 && offset < bytes.len() {
                self.schedule_flush(file)?;
            }
        }

        Ok(self.split_if_needed())
    }

    /// Forces a flush of the current buffer regardless of its size,
    /// following a memory-tracker pause signal.
    ///
    /// # Errors
    ///
    /// Same as [`FileWriter::write`].
    pub fn flush_on_memory_pressure(&mut self, file: &Arc<Mutex<File>>) -> Result<(), StorageError> {
        if !self.current.is_empty() {
            self.schedule_flush(file)?;
        }
        Ok(())
    }

    fn schedule_flush(&mut self, file: &Arc<Mutex<File>>) -> Result<(), StorageError> {
        let fresh = self.pool.acquire(self.config.flush_timeout).map_err(|_| StorageError::Io {
            path: self.path.display().to_string(),
            source: std::io::Error::other("no buffer available to continue writing"),
        })?;
        let buffer = std::mem::replace(&mut self.current, fresh);

        let (tx, rx) = mpsc::channel();
        let result = self.flusher.submit(
            FlushTask {
                buffer,
                file: file.clone(),
                notifier: tx,
            },
            self.config.flush_timeout,
        );
        if let Err(err) = result {
            self.state = WriterState::Aborted;
            return Err(err);
        }
        self.pending.push_back(rx);
        Ok(())
    }

    /// Drains any flush results that have arrived without blocking,
    /// registering completed chunks and aborting on the first failure.
    pub fn reap_completed_flushes(&mut self) -> Result<(), StorageError> {
        while let Some(front) = self.pending.front() {
            match front.try_recv() {
                Ok(Ok(bytes)) => {
                    self.chunk_index.register_chunk(bytes);
                    self.bytes_flushed += bytes;
                    self.pending.pop_front();
                }
                Ok(Err(err)) => {
                    self.state = WriterState::Aborted;
                    self.pending.pop_front();
                    return Err(err);
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.pending.pop_front();
                }
            }
        }
        Ok(())
    }

    fn split_if_needed(&mut self) -> Option<SplitRequest> {
        if self.split_requested {
            return None;
        }
        let observed = self.bytes_flushed + self.current.len() as u64;
        if observed <= self.config.split_threshold {
            return None;
        }
        self.split_requested = true;
        let hard = matches!(self.config.split_mode, SplitMode::Hard);
        if hard {
            self.state = WriterState::Closing;
        }
        Some(SplitRequest {
            observed_bytes: observed,
            hard,
        })
    }

    /// Flushes any remaining buffered bytes, waits (bounded by
    /// `flush_timeout` per pending flush) for in-flight flushes to
    /// complete, and returns the chunk-offset index.
    ///
    /// Always returns an index covering whatever was successfully
    /// flushed, even if a flush failed along the way, so a reader can
    /// decide whether to fall back to the replica.
    pub fn close(&mut self, file: &Arc<Mutex<File>>) -> ChunkOffsetIndex {
        if self.state == WriterState::Accepting {
            self.state = WriterState::Closing;
        }
        if !self.current.is_empty() && self.state != WriterState::Aborted {
            let _ = self.schedule_flush(file);
        }

        while let Some(rx) = self.pending.pop_front() {
            match rx.recv_timeout(self.config.flush_timeout) {
                Ok(Ok(bytes)) => {
                    self.chunk_index.register_chunk(bytes);
                    self.bytes_flushed += bytes;
                }
                Ok(Err(_)) | Err(_) => {
                    self.state = WriterState::Aborted;
                    break;
                }
            }
        }

        if self.state != WriterState::Aborted {
            self.state = WriterState::Closed;
        }
        self.chunk_index.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_monitor::DeviceMonitor;

    fn writer_harness(dir: &Path) -> (FileWriter, Arc<Mutex<File>>) {
        let path = dir.join("partition-0-0");
        let file = Arc::new(Mutex::new(File::create(&path).unwrap()));
        let flusher = Arc::new(DiskFlusher::new(dir, 8, 2, Duration::from_secs(5), Arc::new(DeviceMonitor::new())));
        let pool = BufferPool::new(4, 1);
        let config = FileWriterConfig {
            flush_buffer_size: 16,
            split_threshold: 1_000_000,
            split_mode: SplitMode::Soft,
            flush_timeout: Duration::from_secs(2),
        };
        let writer = FileWriter::create(&path, flusher, pool, config).unwrap();
        (writer, file)
    }

    #[test]
    fn write_below_threshold_does_not_flush_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let (mut writer, file) = writer_harness(dir.path());
        writer.write(&file, b"hi").unwrap();
        assert_eq!(writer.size(), 0);
    }

    #[test]
    fn write_past_flush_buffer_size_schedules_and_reaps_a_flush() {
        let dir = tempfile::tempdir().unwrap();
        let (mut writer, file) = writer_harness(dir.path());
        writer.write(&file, &vec![1u8; 20]).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        writer.reap_completed_flushes().unwrap();
        assert_eq!(writer.size(), 20);
    }

    #[test]
    fn close_flushes_remaining_bytes_and_returns_index() {
        let dir = tempfile::tempdir().unwrap();
        let (mut writer, file) = writer_harness(dir.path());
        writer.write(&file, b"tail").unwrap();
        let index = writer.close(&file);
        assert_eq!(writer.state(), WriterState::Closed);
        assert_eq!(index.total_len(), 4);
    }

    #[test]
    fn split_threshold_emits_a_request_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partition-1-0");
        let file = Arc::new(Mutex::new(File::create(&path).unwrap()));
        let flusher = Arc::new(DiskFlusher::new(dir.path(), 8, 2, Duration::from_secs(5), Arc::new(DeviceMonitor::new())));
        let pool = BufferPool::new(4, 4);
        let config = FileWriterConfig {
            flush_buffer_size: 1_000_000,
            split_threshold: 10,
            split_mode: SplitMode::Soft,
            flush_timeout: Duration::from_secs(2),
        };
        let mut writer = FileWriter::create(&path, flusher, pool, config).unwrap();

        let first = writer.write(&file, &vec![0u8; 20]).unwrap();
        assert!(first.is_some());
        assert!(!first.unwrap().hard);

        let second = writer.write(&file, b"more").unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn hard_split_stops_accepting_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partition-2-0");
        let file = Arc::new(Mutex::new(File::create(&path).unwrap()));
        let flusher = Arc::new(DiskFlusher::new(dir.path(), 8, 2, Duration::from_secs(5), Arc::new(DeviceMonitor::new())));
        let pool = BufferPool::new(4, 4);
        let config = FileWriterConfig {
            flush_buffer_size: 1_000_000,
            split_threshold: 10,
            split_mode: SplitMode::Hard,
            flush_timeout: Duration::from_secs(2),
        };
        let mut writer = FileWriter::create(&path, flusher, pool, config).unwrap();

        let split = writer.write(&file, &vec![0u8; 20]).unwrap();
        assert!(split.unwrap().hard);
        assert_eq!(writer.state(), WriterState::Closing);

        let err = writer.write(&file, b"rejected").unwrap_err();
        assert!(matches!(err, StorageError::WriterAborted { .. }));
    }
}
