//! transport/mod.rs
//! Backend transports plugged under a stream.
//!
//! Design notes:
//! - `Transport` is the operation table every backend implements:
//!   read, write, seek, tell, close, free.
//! - `Backend` is the closed sum over the built-in transports plus a `Custom` slot for
//!   anything else implementing the trait.
//! - Transports never buffer and never retry; the stream does the buffering.

use std::fmt;

use bitflags::bitflags;

use crate::types::StreamResult;

pub mod fd;
pub mod mem;
pub mod secure;

pub use fd::{Descriptor, FdTransport};
pub use mem::{MemBuffer, MemTransport};
pub use secure::{SecureChannel, SecureTransport};

bitflags! {
    /// Ownership and shape flags given at construction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IoFlags: u32 {
        /// The stream owns the descriptor and closes it; otherwise it is left open.
        const FD_CLOSE    = 0x0001;
        /// Release (clear) a shared memory buffer on free.
        const MEM_FREEBUF = 0x0002;
        /// Memory buffer may not grow past its initial length.
        const MEM_FIXED   = 0x0004;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Descriptor,
    Memory,
    Secure,
    Custom,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::Descriptor => "fd",
            TransportKind::Memory     => "mem",
            TransportKind::Secure     => "secure",
            TransportKind::Custom     => "custom",
        };
        f.write_str(name)
    }
}

/// Operation table of a transport.
///
/// Errors carry the operation (`StreamError::Transport { op, .. }`); seek/tell on
/// transports without random access return `StreamError::Unsupported`.
pub trait Transport {
    fn kind(&self) -> TransportKind;

    /// A transport built around a missing or already-released handle reports false;
    /// `Stream::create` refuses it.
    fn is_valid(&self) -> bool {
        true
    }

    /// Read at most `buf.len()` bytes; `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize>;

    /// Write a prefix of `buf`; `Ok(0)` means the transport cannot take more.
    fn write(&mut self, buf: &[u8]) -> StreamResult<usize>;

    /// Absolute seek, returns the new position.
    fn seek(&mut self, pos: u64) -> StreamResult<u64>;

    fn tell(&mut self) -> StreamResult<u64>;

    /// Release the underlying resource. Must tolerate being called twice.
    fn close(&mut self) -> StreamResult<()>;

    /// Final release when the owning stream goes away.
    fn free(&mut self) {}

    fn is_secure(&self) -> bool {
        false
    }

    /// Logical size, when the transport has one.
    fn size(&self) -> Option<u64> {
        None
    }
}

/// The transports a stream can sit on.
pub enum Backend {
    Fd(FdTransport),
    Mem(MemTransport),
    Secure(SecureTransport),
    Custom(Box<dyn Transport>),
}

macro_rules! dispatch {
    ($self:ident, $t:ident => $e:expr) => {
        match $self {
            Backend::Fd($t) => $e,
            Backend::Mem($t) => $e,
            Backend::Secure($t) => $e,
            Backend::Custom($t) => $e,
        }
    };
}

impl Transport for Backend {
    fn kind(&self) -> TransportKind {
        dispatch!(self, t => t.kind())
    }

    fn is_valid(&self) -> bool {
        dispatch!(self, t => t.is_valid())
    }

    fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        dispatch!(self, t => t.read(buf))
    }

    fn write(&mut self, buf: &[u8]) -> StreamResult<usize> {
        dispatch!(self, t => t.write(buf))
    }

    fn seek(&mut self, pos: u64) -> StreamResult<u64> {
        dispatch!(self, t => t.seek(pos))
    }

    fn tell(&mut self) -> StreamResult<u64> {
        dispatch!(self, t => t.tell())
    }

    fn close(&mut self) -> StreamResult<()> {
        dispatch!(self, t => t.close())
    }

    fn free(&mut self) {
        dispatch!(self, t => t.free())
    }

    fn is_secure(&self) -> bool {
        dispatch!(self, t => t.is_secure())
    }

    fn size(&self) -> Option<u64> {
        dispatch!(self, t => t.size())
    }
}

impl From<FdTransport> for Backend {
    fn from(t: FdTransport) -> Self {
        Backend::Fd(t)
    }
}

impl From<MemTransport> for Backend {
    fn from(t: MemTransport) -> Self {
        Backend::Mem(t)
    }
}

impl From<SecureTransport> for Backend {
    fn from(t: SecureTransport) -> Self {
        Backend::Secure(t)
    }
}

impl From<Box<dyn Transport>> for Backend {
    fn from(t: Box<dyn Transport>) -> Self {
        Backend::Custom(t)
    }
}
