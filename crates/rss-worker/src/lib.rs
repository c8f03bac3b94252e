#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `rss_worker` is the shuffle worker: the process producers push batches
//! to and consumers fetch partition files from. It has no opinion on
//! cluster membership or partition placement beyond what [`rss_registry`]
//! hands it; a higher-level master service is expected to own that.
//!
//! # Design
//!
//! - [`push_handler`] defines [`PushHandler`], which applies the push
//!   decision table (closed partition, stale epoch, congestion, memory
//!   pressure, local write, replica forward) to every `PushData` and
//!   `PushMergedData` request.
//! - [`fetch_server`] defines [`FetchServer`], credit-based chunk streaming
//!   over a partition's recorded [`rss_storage::ChunkOffsetIndex`].
//! - [`server`] wires [`rss_transport::Connection`] accept loops to both of
//!   the above.
//! - [`worker`] defines [`Worker`], the process-level assembly: bound
//!   listeners plus the device-monitor and congestion-evaluation
//!   background loops.
//! - [`error`] defines [`WorkerError`], [`error::ServerError`], and
//!   [`error::FetchError`].
//!
//! # See also
//!
//! - `rss-client` for the producer and consumer sides this worker serves.
//! - `rss-registry` for how a partition's primary and replica locations are
//!   resolved before a push or fetch reaches this worker.

pub mod error;
pub mod fetch_server;
pub mod push_handler;
pub mod server;
pub mod worker;

pub use error::{FetchError, WorkerError};
pub use fetch_server::FetchServer;
pub use push_handler::{PushHandler, PushHandlerConfig};
pub use worker::{Worker, WorkerConfig};
