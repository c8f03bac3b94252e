//! A single framed TCP connection to a worker endpoint.

use bytes::BytesMut;
use rss_protocol::{Frame, FrameCodec};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::TransportError;

const READ_CHUNK: usize = 64 * 1024;

/// A connected socket to one worker endpoint, framed with [`FrameCodec`].
///
/// `Connection` owns no retry or pooling policy of its own; see
/// [`crate::ConnectionPool`] for reuse and [`crate::RetryPolicy`] for
/// backoff.
pub struct Connection {
    endpoint: String,
    stream: TcpStream,
    codec: FrameCodec,
    read_buf: BytesMut,
}

impl Connection {
    /// Opens a TCP connection to `endpoint` (`host:port`).
    pub async fn connect(endpoint: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(endpoint)
            .await
            .map_err(|source| TransportError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;
        stream.set_nodelay(true).map_err(|source| TransportError::Connect {
            endpoint: endpoint.to_string(),
            source,
        })?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            stream,
            codec: FrameCodec::new(),
            read_buf: BytesMut::with_capacity(READ_CHUNK),
        })
    }

    /// Wraps an already-accepted socket, labeling it with the peer address
    /// for error messages.
    ///
    /// Used by a server's accept loop, where the socket came from
    /// [`tokio::net::TcpListener::accept`] rather than an outgoing
    /// connect.
    pub fn from_accepted(stream: TcpStream, peer_addr: String) -> Result<Self, TransportError> {
        stream.set_nodelay(true).map_err(|source| TransportError::Connect {
            endpoint: peer_addr.clone(),
            source,
        })?;
        Ok(Self {
            endpoint: peer_addr,
            stream,
            codec: FrameCodec::new(),
            read_buf: BytesMut::with_capacity(READ_CHUNK),
        })
    }

    /// The endpoint this connection was opened against.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Encodes and writes `frame` to the socket.
    pub async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let mut out = BytesMut::new();
        self.codec
            .encode(frame, &mut out)
            .map_err(|source| TransportError::Protocol {
                endpoint: self.endpoint.clone(),
                source,
            })?;
        self.stream
            .write_all(&out)
            .await
            .map_err(|source| TransportError::Io {
                endpoint: self.endpoint.clone(),
                source,
            })
    }

    /// Reads and decodes the next frame from the socket, reading more bytes
    /// from the network as needed.
    pub async fn recv(&mut self) -> Result<Frame, TransportError> {
        loop {
            if let Some(frame) = self
                .codec
                .decode(&mut self.read_buf)
                .map_err(|source| TransportError::Protocol {
                    endpoint: self.endpoint.clone(),
                    source,
                })?
            {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self
                .stream
                .read(&mut chunk)
                .await
                .map_err(|source| TransportError::Io {
                    endpoint: self.endpoint.clone(),
                    source,
                })?;
            if n == 0 {
                return Err(TransportError::ClosedMidFrame {
                    endpoint: self.endpoint.clone(),
                });
            }
            self.read_buf.extend_from_slice(&chunk[..n]);
        }
    }
}
