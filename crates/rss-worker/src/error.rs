//! Errors raised outside the push/fetch wire contract, where there is no
//! [`rss_protocol::Ack`] variant to carry the failure back to a caller.

use thiserror::Error;

/// Errors the fetch server raises resolving or reading an opened stream.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The requested file has no recorded chunk index; it was never
    /// written, or the worker restarted without persisting it.
    #[error("no chunk index for file {file_name}")]
    UnknownFile {
        /// The file name the client asked to open.
        file_name: String,
    },
    /// The client referenced a stream id this server never issued, or that
    /// has already been closed.
    #[error("unknown stream {stream_id}")]
    UnknownStream {
        /// The stream id the client referenced.
        stream_id: u64,
    },
    /// Reading a chunk's bytes off disk failed.
    #[error("I/O error reading {file}: {source}")]
    Io {
        /// The file being read.
        file: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised assembling or tearing down the worker as a whole.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// No disk mount was configured; the worker has nowhere to place
    /// partition files.
    #[error("no disk mounts configured")]
    NoMountsConfigured,
    /// Binding the push or fetch listener socket failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address the worker tried to bind.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised dispatching one connection's frames to the push handler or
/// fetch server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A `shuffle_key` did not split into an `app_id/shuffle_id` pair.
    #[error("malformed shuffle_key {key:?}")]
    MalformedShuffleKey {
        /// The offending key.
        key: String,
    },
    /// A `shuffle_key`'s shuffle id component was not a valid `u32`.
    #[error("malformed shuffle_key {key:?}: shuffle id is not a number")]
    MalformedShuffleId {
        /// The offending key.
        key: String,
    },
    /// A message arrived that has no place in this connection's protocol
    /// (for example a `ChunkData` sent to the server).
    #[error("unexpected message on connection from {peer}")]
    UnexpectedMessage {
        /// The peer that sent it.
        peer: String,
    },
    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] rss_transport::TransportError),
}
