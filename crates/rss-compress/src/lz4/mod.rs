//! LZ4 compression support.
//!
//! Wraps the standard LZ4 frame format (magic bytes, checksums, streaming
//! support) used to compress batch payloads before they are written to disk
//! or sent over the wire.
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "lz4")]
//! # fn example() -> std::io::Result<()> {
//! use rss_compress::lz4::frame;
//! use rss_compress::zlib::CompressionLevel;
//!
//! let data = b"batch payload bytes";
//! let framed = frame::compress_to_vec(data, CompressionLevel::Default)?;
//! let restored = frame::decompress_to_vec(&framed)?;
//! assert_eq!(restored, data);
//! # Ok(())
//! # }
//! ```

pub mod frame;

pub use frame::{CountingLz4Decoder, CountingLz4Encoder, compress_to_vec, decompress_to_vec};

use crate::algorithm::CompressionAlgorithm;

/// Returns the preferred compression algorithm when callers do not provide one explicitly.
#[must_use]
pub const fn default_algorithm() -> CompressionAlgorithm {
    CompressionAlgorithm::Lz4
}
