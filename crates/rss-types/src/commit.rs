//! The monoidal byte/record/CRC summary written alongside a partition and
//! recomputed on read to verify integrity.

use rss_checksums::CommitDigest;

/// Byte, record, and CRC32C summary of everything written for one map task
/// (or, combined, for a whole partition).
///
/// Two values combine by summing their byte and record counts and chaining
/// their CRC32C values, matching spec.md's monoidal `combine` exactly: the
/// combined digest is the same whether the underlying bytes were hashed in
/// one pass or chunk by chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommitMetadata {
    /// Total payload bytes covered by this digest.
    pub bytes: u64,
    /// CRC32C over `bytes`, in combination order.
    pub crc32c: u32,
    /// Number of records (application-level units, not batches) covered.
    pub record_count: u64,
}

impl CommitMetadata {
    /// The identity element: zero bytes, zero records, a zero CRC.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            bytes: 0,
            crc32c: 0,
            record_count: 0,
        }
    }

    /// Builds a `CommitMetadata` from a digest accumulated over this map
    /// task's batches and the number of records it produced.
    #[must_use]
    pub const fn from_digest(digest: CommitDigest, record_count: u64) -> Self {
        Self {
            bytes: digest.bytes_hashed(),
            crc32c: digest.finalize(),
            record_count,
        }
    }

    /// Combines this metadata with one covering a byte range that
    /// immediately follows this one's range.
    #[must_use]
    pub fn combine(self, following: Self) -> Self {
        let combined_digest = CommitDigest::resume(self.crc32c, self.bytes)
            .combine(CommitDigest::resume(following.crc32c, following.bytes));
        Self {
            bytes: combined_digest.bytes_hashed(),
            crc32c: combined_digest.finalize(),
            record_count: self.record_count + following.record_count,
        }
    }
}

impl Default for CommitMetadata {
    fn default() -> Self {
        Self::empty()
    }
}

/// Byte length of the encoded [`CommitMetadata`].
pub const COMMIT_METADATA_LEN: usize = 20;

impl CommitMetadata {
    /// Encodes this metadata as twenty little-endian bytes: `bytes` (8),
    /// `crc32c` (4), `record_count` (8).
    ///
    /// This is the payload carried by the batch with
    /// [`crate::wire::METADATA_BATCH_ID`].
    #[must_use]
    pub const fn to_bytes(self) -> [u8; COMMIT_METADATA_LEN] {
        let mut out = [0u8; COMMIT_METADATA_LEN];
        let bytes = self.bytes.to_le_bytes();
        let crc32c = self.crc32c.to_le_bytes();
        let record_count = self.record_count.to_le_bytes();

        let mut i = 0;
        while i < 8 {
            out[i] = bytes[i];
            out[12 + i] = record_count[i];
            i += 1;
        }
        i = 0;
        while i < 4 {
            out[8 + i] = crc32c[i];
            i += 1;
        }
        out
    }

    /// Decodes metadata from exactly twenty little-endian bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; COMMIT_METADATA_LEN]) -> Self {
        Self {
            bytes: u64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
            crc32c: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            record_count: u64::from_le_bytes([
                bytes[12], bytes[13], bytes[14], bytes[15], bytes[16], bytes[17], bytes[18], bytes[19],
            ]),
        }
    }
}
