//! types.rs
//! Unified stream error and the operation tags attached to transport failures.

use std::fmt;
use std::io;

use crate::codec::CodecError;

/// Stream operation, carried by [`StreamError::Transport`] so callers can tell
/// which call hit the failing descriptor or channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Read,
    Write,
    Seek,
    Tell,
    Flush,
    Close,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Read  => "read",
            Op::Write => "write",
            Op::Seek  => "seek",
            Op::Tell  => "tell",
            Op::Flush => "flush",
            Op::Close => "close",
        };
        f.write_str(name)
    }
}

/// Error classes surfaced by every stream, transport and codec operation.
///
/// Nothing is retried internally: a `Transport` error is the transport's own
/// `io::Error` with the failing operation attached.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Descriptor, memory or secure-channel failure.
    #[error("transport {op} failed: {source}")]
    Transport {
        op: Op,
        #[source]
        source: io::Error,
    },

    /// Malformed parameters (programming error).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not valid given current buffering, chain or lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Operation not meaningful for this transport.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Bad cipher padding, malformed compressed stream, checksum mismatch.
    #[error("corrupt data: {0}")]
    CorruptData(String),
}

impl StreamError {
    pub fn transport(op: Op, source: io::Error) -> Self {
        StreamError::Transport { op, source }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, StreamError::Transport { .. })
    }
}

impl From<CodecError> for StreamError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::InvalidArgument(msg) => StreamError::InvalidArgument(msg),
            CodecError::InvalidState(msg) => StreamError::InvalidState(msg),
            CodecError::CorruptData(msg) => StreamError::CorruptData(msg),
        }
    }
}

impl From<StreamError> for io::Error {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::Transport { source, .. } => source,
            StreamError::InvalidArgument(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            StreamError::InvalidState(msg) => io::Error::new(io::ErrorKind::Other, msg),
            StreamError::Unsupported(msg) => io::Error::new(io::ErrorKind::Unsupported, msg),
            StreamError::CorruptData(msg) => io::Error::new(io::ErrorKind::InvalidData, msg),
        }
    }
}

pub type StreamResult<T> = Result<T, StreamError>;
