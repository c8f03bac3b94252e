#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `rss_client` is the shuffle client: the map-task side that pushes
//! batches through [`pusher::DataPusher`], and the reduce-task side that
//! reassembles a partition through [`input_stream::InputStream`]. Neither
//! side owns partition placement; both expect a caller to resolve
//! [`rss_types::PartitionLocation`]s from a registry or control plane first.
//!
//! # Design
//!
//! - [`pusher`] defines [`DataPusher`], a bounded idle/working queue with
//!   per-destination in-flight caps and timeout-triggered retry.
//! - [`input_stream`] defines [`InputStream`], a multi-location reader with
//!   replica load-spread, dedup, and end-to-end integrity verification.
//! - [`error`] defines [`PusherError`] and [`InputStreamError`].
//!
//! # See also
//!
//! - `rss-worker` for the push handler and fetch server this client talks
//!   to.
//! - `rss-transport` for the connection pooling, retry policy, and
//!   fetch-excluded set both sides share.

pub mod error;
pub mod input_stream;
pub mod pusher;

pub use error::{InputStreamError, PusherError};
pub use input_stream::{InputStream, InputStreamConfig, LocationSource};
pub use pusher::{DataPusher, DataPusherConfig};
