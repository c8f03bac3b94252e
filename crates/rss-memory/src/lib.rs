#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `rss_memory` is the worker's memory-management floor: a bounded pool of
//! reusable composite buffers, and a process-wide gauge of direct-memory
//! usage that raises edge-triggered pause and resume signals. Every other
//! worker-side crate that touches a byte buffer depends on this one; it has
//! no dependency back on them.
//!
//! # Design
//!
//! - [`buffer`] defines [`PooledBuffer`], a buffer made of fixed-size slabs
//!   so a single write can gather many incoming batches.
//! - [`pool`] defines [`BufferPool`], which hands out [`Acquired`] guards
//!   that return their buffer to the pool on drop.
//! - [`tracker`] defines [`MemoryTracker`], which aggregates the
//!   netty-direct, disk-buffer-in-flight, and sort-memory counters and
//!   publishes [`TrackerState`] transitions on a [`tokio::sync::watch`]
//!   channel.
//! - [`error`] defines [`MemoryError`].
//!
//! # See also
//!
//! - `rss-storage`'s file writer and disk flusher, the two largest
//!   consumers of [`BufferPool`] and the two biggest contributors to
//!   [`MemoryTracker`]'s counters.
//! - `rss-worker`'s push handler, which checks [`TrackerState`] before
//!   admitting a new push.

pub mod buffer;
pub mod error;
pub mod pool;
pub mod tracker;

pub use buffer::PooledBuffer;
pub use error::MemoryError;
pub use pool::{Acquired, BufferPool};
pub use tracker::{MemoryKind, MemoryTracker, MemoryTrackerConfig, TrackerState};
