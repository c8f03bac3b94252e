//! Per-partition file writing, disk flushing, and device health for the
//! shuffle worker's data plane.
//!
//! # Overview
//!
//! A [`FileWriter`] owns one partition location's append-only file. It
//! buffers incoming bytes in a [`rss_memory::PooledBuffer`] and, once the
//! buffer fills, hands it to a per-mount [`DiskFlusher`] for a vectored
//! write and fsync. Completed flushes feed a [`ChunkOffsetIndex`], which a
//! fetch server later uses to address individual chunks. A [`DeviceMonitor`]
//! tracks each mount's health independently of any one writer, so a single
//! bad disk can be isolated without tearing down the whole worker.
//!
//! # Design
//!
//! The flusher is thread-based, not async: spec work here is bounded,
//! blocking I/O, and a small fixed pool of `std::thread` workers per mount
//! matches the one-thread-pool-per-disk shape this component is built
//! around. The writer and index are synchronous types driven by whichever
//! task owns the connection (the worker's push handler); they hold no
//! internal thread of their own.
//!
//! # See also
//!
//! [`rss_memory`] for the buffer pool `FileWriter` acquires from.
//! [`rss_registry`] for the partition location metadata a split request
//! feeds back into.

pub mod chunk_index;
pub mod device_monitor;
pub mod error;
pub mod flusher;
pub mod writer;

pub use chunk_index::ChunkOffsetIndex;
pub use device_monitor::{DeviceMonitor, MountFailureKind, MountHealth};
pub use error::StorageError;
pub use flusher::{DiskFlusher, FlushTask};
pub use writer::{FileWriter, FileWriterConfig, SplitMode, SplitRequest, WriterState};
