//! The request and response message bodies carried inside a [`crate::Frame`].

use rss_types::{BatchHeader, PartitionRole};

/// Which role a [`PushData`] or [`PushMergedData`] request is addressed to.
///
/// The worker's push handler sets this to [`PushMode::Replica`] when it
/// forwards a primary's body to the replica push client, so the replica's
/// handler knows not to fork the write a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PushMode {
    /// The request targets the partition's primary copy and, if a replica
    /// is configured, should be forked to it.
    Primary,
    /// The request targets a replica directly; the handler must not
    /// forward it again.
    Replica,
}

impl PushMode {
    /// Returns the [`PushMode`] matching a partition location's role.
    #[must_use]
    pub const fn for_role(role: PartitionRole) -> Self {
        match role {
            PartitionRole::Primary => Self::Primary,
            PartitionRole::Replica => Self::Replica,
        }
    }
}

/// A single batch pushed to one partition location.
///
/// See spec.md's Push Handler section for the decision table applied on
/// arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PushData {
    /// Opaque key identifying the shuffle and partition this batch belongs
    /// to, formatted `{app_id}/{shuffle_id}/{partition_id}`.
    pub shuffle_key: String,
    /// The partition location this push is addressed to.
    pub partition_location_id: u32,
    /// The epoch the producer believes is current for this partition.
    pub epoch: u32,
    /// Whether this request targets the primary or the replica.
    pub mode: PushMode,
    /// The batch header: map id, attempt id, batch id, and payload length.
    pub header: BatchHeader,
    /// The batch payload. Length must match `header.payload_size`.
    pub body: Vec<u8>,
}

/// A vector of batches sharing one endpoint, merged into a single request to
/// amortize per-request overhead for small batches.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PushMergedData {
    /// Opaque key identifying the shuffle and partition these batches
    /// belong to.
    pub shuffle_key: String,
    /// The partition location this push is addressed to.
    pub partition_location_id: u32,
    /// The epoch the producer believes is current for this partition.
    pub epoch: u32,
    /// Whether this request targets the primary or the replica.
    pub mode: PushMode,
    /// One header per batch, in the same order as `offsets`.
    pub headers: Vec<BatchHeader>,
    /// Byte offset of each batch's payload within `body`, same length and
    /// order as `headers`.
    pub offsets: Vec<u32>,
    /// The concatenated payload of every batch in this request.
    pub body: Vec<u8>,
}

/// The outcome of a [`PushData`] or [`PushMergedData`] request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ack {
    /// The push was accepted; for a primary push, both the local
    /// flush-enqueue and the replica's ack completed.
    Success,
    /// The partition exceeded its soft split threshold; the producer
    /// should request a new epoch while this one drains.
    SoftSplit,
    /// The partition exceeded its hard split threshold; the producer must
    /// stop pushing to this epoch immediately.
    HardSplit,
    /// The partition's stage has ended; the producer should terminate its
    /// map task cleanly.
    StageEnd,
    /// The primary's local write failed.
    PushDataFailPrimary,
    /// The replica's write failed after retries.
    PushDataFailReplica,
    /// The request was rejected due to congestion control; the producer
    /// should back off before retrying.
    CongestControl,
    /// The worker is in `PAUSE_PUSH`; the producer should slow down or
    /// wait before retrying.
    PausePush,
}

impl Ack {
    /// Returns `true` if the push should be considered accepted.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Requests the server begin streaming chunks for a partition's file,
/// restricted to the map id range `[start_map, end_map)`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpenStream {
    /// Opaque key identifying the shuffle and partition to read.
    pub shuffle_key: String,
    /// The partition's file name on the worker.
    pub file_name: String,
    /// The inclusive lower bound of the map id range to read.
    pub start_map: u32,
    /// The exclusive upper bound of the map id range to read.
    pub end_map: u32,
    /// The number of chunks the client is initially willing to buffer.
    pub initial_credit: u32,
}

/// The server's response to [`OpenStream`]: a handle the client uses to
/// track credit and correlate incoming [`ChunkData`] frames.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamHandle {
    /// Identifies this stream for subsequent [`ReadAddCredit`] frames.
    pub stream_id: u64,
    /// The total number of chunks the server intends to send.
    pub num_chunks: u32,
    /// Byte offset of each chunk within the partition's file, length
    /// `num_chunks + 1` (the last entry is the file's total length).
    pub chunk_offsets: Vec<u64>,
}

/// Replenishes a stream's credit so the server may send more chunks.
///
/// One-way: the server does not acknowledge this message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadAddCredit {
    /// The stream to add credit to.
    pub stream_id: u64,
    /// The number of additional chunks the client is now willing to
    /// buffer.
    pub credit: u32,
}

/// One chunk of a streamed partition file, sent server to client.
///
/// Sending a `ChunkData` frame consumes one unit of the stream's credit;
/// the server refuses to send further chunks once credit reaches zero.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkData {
    /// The stream this chunk belongs to.
    pub stream_id: u64,
    /// This chunk's index within the stream, starting at zero.
    pub chunk_index: u32,
    /// The number of chunks still queued to send after this one.
    pub backlog: u32,
    /// This chunk's byte offset within the partition's file.
    pub offset: u64,
    /// The chunk's payload bytes.
    pub payload: Vec<u8>,
}

/// Any message that can be framed by [`crate::FrameCodec`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Message {
    /// See [`PushData`].
    PushData(PushData),
    /// See [`PushMergedData`].
    PushMergedData(PushMergedData),
    /// The server's reply to a push request.
    Ack(Ack),
    /// See [`OpenStream`].
    OpenStream(OpenStream),
    /// See [`StreamHandle`].
    StreamHandle(StreamHandle),
    /// See [`ReadAddCredit`].
    ReadAddCredit(ReadAddCredit),
    /// See [`ChunkData`].
    ChunkData(ChunkData),
}
