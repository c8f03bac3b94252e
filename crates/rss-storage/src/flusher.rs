//! Per-mount disk flusher: a bounded work queue drained by a small pool of
//! writer threads.

use std::fs::File;
use std::io::{IoSlice, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use rss_memory::Acquired;

use crate::device_monitor::{DeviceMonitor, MountFailureKind};
use crate::error::StorageError;

/// A single unit of flush work: write a buffer's components to a file and
/// report back how many bytes landed.
pub struct FlushTask {
    /// The buffer to write and, once written, return to its pool.
    pub buffer: Acquired,
    /// The destination file, shared with the [`crate::FileWriter`] that
    /// owns it.
    pub file: Arc<Mutex<File>>,
    /// Notified with the outcome once the write (and its fsync) completes
    /// or fails.
    pub notifier: mpsc::Sender<Result<u64, StorageError>>,
}

/// One flusher per mount point: a bounded queue of [`FlushTask`]s drained
/// by `worker_threads` writer threads.
///
/// On the first I/O error, the flusher latches a stopped flag; every
/// subsequent [`DiskFlusher::submit`] fails fast with
/// [`StorageError::WriterAborted`] rather than queuing more work behind a
/// broken mount.
pub struct DiskFlusher {
    mount: PathBuf,
    task_tx: Sender<FlushTask>,
    stopped: Arc<AtomicBool>,
    _workers: Vec<JoinHandle<()>>,
}

impl DiskFlusher {
    /// Spawns `worker_threads` writer threads draining a queue of capacity
    /// `queue_capacity`. A write whose wall-clock time exceeds
    /// `slow_flush_threshold` reports the mount to `device_monitor` as
    /// [`MountFailureKind::FlushTimeout`] and stops this flusher.
    #[must_use]
    pub fn new(
        mount: impl Into<PathBuf>,
        queue_capacity: usize,
        worker_threads: usize,
        slow_flush_threshold: Duration,
        device_monitor: Arc<DeviceMonitor>,
    ) -> Self {
        let mount = mount.into();
        let (task_tx, task_rx): (Sender<FlushTask>, Receiver<FlushTask>) = crossbeam_channel::bounded(queue_capacity.max(1));
        let stopped = Arc::new(AtomicBool::new(false));

        let workers = (0..worker_threads.max(1))
            .map(|_| {
                let task_rx = task_rx.clone();
                let stopped = stopped.clone();
                let device_monitor = device_monitor.clone();
                let mount = mount.clone();
                std::thread::spawn(move || worker_loop(&mount, &task_rx, &stopped, &device_monitor, slow_flush_threshold))
            })
            .collect();

        Self {
            mount,
            task_tx,
            stopped,
            _workers: workers,
        }
    }

    /// Enqueues `task`, waiting up to `timeout` for queue space.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriterAborted`] if this flusher has already
    /// latched its stopped flag, or [`StorageError::FlusherBackPressure`]
    /// if the queue is still full after `timeout`.
    pub fn submit(&self, task: FlushTask, timeout: Duration) -> Result<(), StorageError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(StorageError::WriterAborted {
                path: self.mount.display().to_string(),
            });
        }
        let started = Instant::now();
        self.task_tx.send_timeout(task, timeout).map_err(|_| StorageError::FlusherBackPressure {
            waited_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Returns `true` once this flusher has latched its stopped flag after
    /// an I/O error or a slow-flush timeout.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// The mount this flusher owns.
    #[must_use]
    pub fn mount(&self) -> &Path {
        &self.mount
    }
}

fn worker_loop(
    mount: &Path,
    task_rx: &Receiver<FlushTask>,
    stopped: &AtomicBool,
    device_monitor: &DeviceMonitor,
    slow_flush_threshold: Duration,
) {
    while let Ok(task) = task_rx.recv() {
        if stopped.load(Ordering::Acquire) {
            let _ = task.notifier.send(Err(StorageError::WriterAborted {
                path: mount.display().to_string(),
            }));
            continue;
        }

        let started = Instant::now();
        let outcome = write_task(&task);
        let elapsed = started.elapsed();

        match outcome {
            Ok(bytes) => {
                if elapsed > slow_flush_threshold {
                    stopped.store(true, Ordering::Release);
                    device_monitor.on_error(mount, MountFailureKind::FlushTimeout);
                }
                let _ = task.notifier.send(Ok(bytes));
            }
            Err(source) => {
                stopped.store(true, Ordering::Release);
                device_monitor.on_error(mount, MountFailureKind::ReadWriteFailure);
                let _ = task.notifier.send(Err(StorageError::Io {
                    path: mount.display().to_string(),
                    source,
                }));
            }
        }
    }
}

fn write_task(task: &FlushTask) -> std::io::Result<u64> {
    let mut slices: Vec<IoSlice<'_>> = task.buffer.components().map(IoSlice::new).collect();
    let mut file = task.file.lock().expect("file mutex poisoned by a prior panic");

    let mut total = 0u64;
    while !slices.is_empty() {
        let n = file.write_vectored(&slices)?;
        if n == 0 {
            return Err(std::io::Error::new(std::io::ErrorKind::WriteZero, "failed to write whole buffer"));
        }
        total += n as u64;
        IoSlice::advance_slices(&mut slices, n);
    }
    file.sync_data()?;
    Ok(total)
}
