#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `rss_types` is the shared data model for the remote shuffle service: the
//! identifiers, wire-adjacent value types, and error taxonomy that every
//! other crate in the workspace depends on. It has no I/O and no async
//! runtime dependency, so it can be pulled into the producer, the worker,
//! and the client without pulling in `tokio` or a transport stack.
//!
//! # Design
//!
//! - [`ids`] defines [`ShuffleId`] and [`UserIdentifier`], the two scoping
//!   keys used throughout the registry, the congestion controller, and the
//!   storage layer.
//! - [`location`] defines [`PartitionLocation`], [`PartitionRole`], and
//!   [`StorageHint`] — the tuple a client resolves before it can push or
//!   fetch a partition.
//! - [`wire`] defines [`BatchHeader`], the sixteen-byte little-endian header
//!   that precedes every batch payload on the wire and on disk.
//! - [`commit`] defines [`CommitMetadata`], the monoidal byte/record/CRC
//!   summary a file writer accumulates and a client recomputes to verify
//!   integrity.
//! - [`bitmap`] defines [`MapIdBitmap`], a small hand-rolled word bitmap used
//!   by the fetch server to skip excluded map outputs without allocating a
//!   heavier set structure.
//! - [`error`] defines [`ShuffleError`], the taxonomy every other crate's
//!   error type converts into or wraps.
//!
//! # See also
//!
//! - `rss-registry` for the partition location registry built on
//!   [`PartitionLocation`].
//! - `rss-protocol` for the wire messages that carry [`BatchHeader`] and
//!   [`CommitMetadata`].

pub mod bitmap;
pub mod commit;
pub mod error;
pub mod ids;
pub mod location;
pub mod wire;

pub use bitmap::MapIdBitmap;
pub use commit::CommitMetadata;
pub use error::ShuffleError;
pub use ids::{PartitionId, ShuffleId, UserIdentifier};
pub use location::{PartitionLocation, PartitionRole, StorageHint};
pub use wire::BatchHeader;
