#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `rss_protocol` defines the wire messages a producer, a worker, and a
//! consumer exchange, and the framing that carries them over a `TcpStream`.
//! It depends on [`rss_types`] for the value types a message carries
//! ([`rss_types::BatchHeader`], [`rss_types::CommitMetadata`]) and on
//! [`rss_checksums`] only transitively, through those types.
//!
//! # Design
//!
//! - [`message`] defines the five request/response message bodies: `PushData`,
//!   `PushMergedData`, `OpenStream`, `ReadAddCredit`, and `ChunkData`, plus the
//!   [`message::Ack`] status enum and the [`message::StreamHandle`] response.
//! - [`frame`] defines [`frame::Frame`], the tagged envelope every message is
//!   wrapped in, and [`frame::FrameCodec`], a [`tokio_util::codec::Decoder`]
//!   and [`tokio_util::codec::Encoder`] pair that frames a byte stream into
//!   `Frame`s with a four-byte length prefix followed by a one-byte tag.
//! - [`error`] defines [`error::ProtocolError`] for malformed frames,
//!   oversized payloads, and unknown tags.
//!
//! # Wire format
//!
//! Every frame is `length: u32 le | tag: u8 | body`, where `length` counts
//! the tag byte plus the body. A decoder that has not yet seen `length`
//! bytes beyond the four-byte prefix returns `Ok(None)` and waits for more
//! input, matching [`tokio_util::codec::LengthDelimitedCodec`]'s contract.
//!
//! # See also
//!
//! - `rss-transport` for the connection pool and retry policy built on top
//!   of [`frame::FrameCodec`].
//! - `rss-worker`'s push handler and fetch server, the two message
//!   producers and consumers on the worker side.

pub mod error;
pub mod frame;
pub mod message;

pub use error::ProtocolError;
pub use frame::{Frame, FrameCodec, MAX_FRAME_LEN};
pub use message::{Ack, ChunkData, Message, OpenStream, PushData, PushMergedData, PushMode, ReadAddCredit, StreamHandle};
