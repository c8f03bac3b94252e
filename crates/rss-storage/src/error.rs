//! Errors raised by the chunk index, the flusher, and the file writer.

use thiserror::Error;

/// Errors the storage layer can raise.
#[derive(Debug, Error)]
pub enum StorageError {
    /// [`crate::DiskFlusher::submit`] could not enqueue a task within its
    /// timeout because the work queue stayed full.
    #[error("flusher back-pressure: queue full after {waited_ms}ms")]
    FlusherBackPressure {
        /// How long the caller waited before giving up.
        waited_ms: u64,
    },
    /// A write to the underlying file failed.
    #[error("I/O error writing to {path}: {source}")]
    Io {
        /// The file path the write targeted.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The writer is no longer accepting writes because a prior flush
    /// failed.
    #[error("writer for {path} aborted by a prior flush failure")]
    WriterAborted {
        /// The file path the writer owned.
        path: String,
    },
    /// The mount this writer's file lives on has been isolated by the
    /// device monitor.
    #[error("mount {mount} is isolated: {reason}")]
    MountIsolated {
        /// The isolated mount.
        mount: String,
        /// Why the mount was isolated.
        reason: String,
    },
}
