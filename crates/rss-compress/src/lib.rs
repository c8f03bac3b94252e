#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `rss_compress` exposes the compression primitives used to shrink batch
//! payloads before a map task pushes them and before a reduce task stores
//! them in its destination buffer. Higher layers (the pusher and the input
//! stream) compose these helpers so the same encoder/decoder implementations
//! are shared between producer and consumer.
//!
//! # Design
//!
//! The crate currently provides the [`zlib`], [`lz4`], and [`zstd`] modules, which
//! implement streaming-friendly encoders and decoders built on top of
//! [`flate2`](https://docs.rs/flate2), [`lz4_flex`](https://docs.rs/lz4_flex), and
//! [`zstd`](https://docs.rs/zstd) respectively. The API emphasises
//! incremental processing: callers provide scratch buffers that are filled with
//! compressed or decompressed data while the internal state tracks totals for
//! diagnostics and progress reporting.
//!
//! # Invariants
//!
//! - Encoders and decoders never allocate internal output buffers. All output is
//!   written into the caller-provided vectors, allowing upper layers to reuse
//!   storage across files.
//! - Streams are finalised explicitly via
//!   [`zlib::CountingZlibEncoder::finish`], [`lz4::CountingLz4Encoder::finish`],
//!   and [`zstd::CountingZstdEncoder::finish`], which emit trailer bytes and
//!   report the final compressed length.
//! - Errors from the underlying zlib implementation are surfaced as
//!   [`std::io::Error`] values to integrate with the rest of the workspace.
//!
//! # Errors
//!
//! The encoder and decoder functions return [`std::io::Result`]. When zlib
//! reports an error the helper wraps it in [`std::io::ErrorKind::Other`].
//!
//! # Examples
//!
//! Compressing and decompressing a buffer with the streaming encoder and
//! convenience helpers:
//!
//! ```
//! use rss_compress::zlib::{CompressionLevel, CountingZlibEncoder, compress_to_vec, decompress_to_vec};
//!
//! # fn main() -> std::io::Result<()> {
//! let data = b"streaming example payload";
//! let mut encoder = CountingZlibEncoder::new(CompressionLevel::Default);
//! encoder.write(data)?;
//! let compressed_len = encoder.finish()?;
//! assert!(compressed_len > 0);
//!
//! let compressed = compress_to_vec(data, CompressionLevel::Default)?;
//! let decompressed = decompress_to_vec(&compressed)?;
//! assert_eq!(decompressed, data);
//! # Ok(())
//! # }
//! ```
//!
//! # See also
//!
//! - [`zlib`] for the zlib encoder/decoder implementation and API surface.
//! - [`lz4`] for the LZ4 frame encoder/decoder implementation.
//! - [`zstd`] for the Zstandard encoder/decoder implementation.
//! - `rss-client` for the input stream that decompresses batch payloads as
//!   it reassembles a partition.

pub mod algorithm;
mod common;
#[cfg(feature = "lz4")]
pub mod lz4;
pub mod strategy;
pub mod zlib;
#[cfg(feature = "zstd")]
pub mod zstd;

pub use common::CountingSink;
