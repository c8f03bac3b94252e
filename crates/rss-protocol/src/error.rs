//! Errors raised while framing or parsing a message.

use thiserror::Error;

/// Errors a [`crate::FrameCodec`] or a message parser can raise.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame's declared length exceeds [`crate::MAX_FRAME_LEN`].
    #[error("frame length {len} exceeds the maximum of {max}")]
    FrameTooLarge {
        /// The length the frame header declared.
        len: u32,
        /// The configured maximum.
        max: u32,
    },
    /// The frame's tag byte does not name a known message type.
    #[error("unknown message tag {tag}")]
    UnknownTag {
        /// The tag byte read from the wire.
        tag: u8,
    },
    /// The frame body was shorter or malformed relative to what its message
    /// type requires.
    #[error("malformed {message} body: {reason}")]
    MalformedBody {
        /// The message type the tag identified.
        message: &'static str,
        /// A human-readable description of the problem.
        reason: String,
    },
    /// The frame body's trailing bytes did not match a fixed-width field,
    /// such as a UTF-8 string or a variable-length array length prefix.
    #[error("truncated frame: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// The minimum number of bytes the parser needed.
        expected: usize,
        /// The number of bytes actually available.
        actual: usize,
    },
    /// An I/O error occurred while reading or writing the underlying
    /// stream.
    #[error("I/O error framing a message: {0}")]
    Io(#[from] std::io::Error),
}
