//! codec/types.rs
//! The stage contract every transform implements.
//!
//! Design notes:
//! - A stage writes into a caller-provided, bounded destination (its staging area)
//!   and reports how much input it consumed and how much output it produced.
//! - Consumed and produced counts are independent: compression shrinks, padding grows,
//!   a partial cipher block consumes without producing.
//! - `flush(Complete)` finalizes (trailer, padding) and is legal once per stream end;
//!   `flush(Chunk)` only drains what is already transformable.

use std::fmt;

/// How far a flush is allowed to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// Mid-stream drain, no finalization side effects.
    Chunk,
    /// End of stream: emit trailers, padding, final blocks.
    Complete,
}

impl fmt::Display for FlushMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushMode::Chunk    => f.write_str("chunk"),
            FlushMode::Complete => f.write_str("complete"),
        }
    }
}

/// Whether a flush call left output behind because `dst` was too small.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    More,
    Done,
}

/// Result of one `Codec::transform` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transformed {
    pub consumed: usize,
    pub produced: usize,
}

impl Transformed {
    pub fn new(consumed: usize, produced: usize) -> Self {
        Self { consumed, produced }
    }
}

/// Result of one `Codec::flush` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flushed {
    pub produced: usize,
    pub status: FlushStatus,
}

impl Flushed {
    pub fn done(produced: usize) -> Self {
        Self { produced, status: FlushStatus::Done }
    }

    pub fn more(produced: usize) -> Self {
        Self { produced, status: FlushStatus::More }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("invalid codec argument: {0}")]
    InvalidArgument(String),

    #[error("invalid codec state: {0}")]
    InvalidState(String),

    #[error("corrupt codec input: {0}")]
    CorruptData(String),
}

/// One transform stage.
///
/// Implementations are driven by [`CodecChain`](crate::codec::CodecChain), which owns
/// them exclusively and guarantees `dst` is the free part of the stage's staging area.
pub trait Codec {
    /// Short diagnostic name ("null", "gzip", "aes-256-cbc", ...).
    fn name(&self) -> &'static str;

    /// Transform a prefix of `src` into `dst`.
    ///
    /// `src` may be empty: the stage should then emit output it is still holding
    /// (e.g. decompressed bytes that did not fit last time) or report `0/0`.
    fn transform(&mut self, src: &[u8], dst: &mut [u8]) -> Result<Transformed, CodecError>;

    /// Drain trailing output into `dst`. Called repeatedly until it returns
    /// [`FlushStatus::Done`].
    fn flush(&mut self, dst: &mut [u8], mode: FlushMode) -> Result<Flushed, CodecError>;

    /// Stages that carry state across calls make a stream non-seekable.
    fn is_stateful(&self) -> bool {
        true
    }

    /// Release resources held by the stage. Called once when the owning chain drops it.
    fn release(&mut self) {}
}
