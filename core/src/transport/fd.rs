//! transport/fd.rs
//! Descriptor transport: files and sockets.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::net::{Shutdown, TcpStream};
#[cfg(unix)]
use std::os::unix::net::UnixStream;

use log::debug;

use crate::transport::{IoFlags, Transport, TransportKind};
use crate::types::{Op, StreamError, StreamResult};

/// An OS descriptor the transport can drive.
#[derive(Debug)]
pub enum Descriptor {
    File(File),
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Descriptor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Descriptor::File(f) => f.read(buf),
            Descriptor::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            Descriptor::Unix(s) => s.read(buf),
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Descriptor::File(f) => f.write(buf),
            Descriptor::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            Descriptor::Unix(s) => s.write(buf),
        }
    }

    /// An independent OS descriptor for the same file or socket (dup(2)).
    pub fn try_clone(&self) -> io::Result<Descriptor> {
        Ok(match self {
            Descriptor::File(f) => Descriptor::File(f.try_clone()?),
            Descriptor::Tcp(s) => Descriptor::Tcp(s.try_clone()?),
            #[cfg(unix)]
            Descriptor::Unix(s) => Descriptor::Unix(s.try_clone()?),
        })
    }

    fn is_socket(&self) -> bool {
        !matches!(self, Descriptor::File(_))
    }
}

impl From<File> for Descriptor {
    fn from(f: File) -> Self {
        Descriptor::File(f)
    }
}

impl From<TcpStream> for Descriptor {
    fn from(s: TcpStream) -> Self {
        Descriptor::Tcp(s)
    }
}

#[cfg(unix)]
impl From<UnixStream> for Descriptor {
    fn from(s: UnixStream) -> Self {
        Descriptor::Unix(s)
    }
}

pub struct FdTransport {
    fd: Option<Descriptor>,
    flags: IoFlags,
    closed: bool,
    /// Duplicate of a descriptor the caller still holds; never shut down.
    borrowed: bool,
    transferred: u64,
}

impl FdTransport {
    pub fn new(fd: impl Into<Descriptor>, flags: IoFlags) -> Self {
        Self { fd: Some(fd.into()), flags, closed: false, borrowed: false, transferred: 0 }
    }

    /// Transport that closes the descriptor on `close`.
    pub fn owned(fd: impl Into<Descriptor>) -> Self {
        Self::new(fd, IoFlags::FD_CLOSE)
    }

    /// Transport over a duplicate of a descriptor the caller keeps. Close drops the
    /// duplicate only: a borrowed socket is never shut down, the connection stays
    /// usable through the caller's descriptor.
    pub fn borrowed(fd: &Descriptor) -> StreamResult<Self> {
        let dup = fd.try_clone().map_err(|e| {
            StreamError::InvalidArgument(format!("cannot duplicate descriptor: {}", e))
        })?;
        let mut t = Self::new(dup, IoFlags::FD_CLOSE);
        t.borrowed = true;
        Ok(t)
    }

    pub fn is_borrowed(&self) -> bool {
        self.borrowed
    }

    pub fn flags(&self) -> IoFlags {
        self.flags
    }

    fn fd_mut(&mut self, op: Op) -> StreamResult<&mut Descriptor> {
        if self.closed {
            return Err(StreamError::InvalidState(format!("fd {} after close", op)));
        }
        self.fd
            .as_mut()
            .ok_or_else(|| StreamError::InvalidState(format!("fd {} on a released descriptor", op)))
    }

    fn file_mut(&mut self, op: Op) -> StreamResult<&mut File> {
        match self.fd_mut(op)? {
            Descriptor::File(f) => Ok(f),
            _ => Err(StreamError::Unsupported(format!("{} on a socket descriptor", op))),
        }
    }
}

impl Transport for FdTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Descriptor
    }

    fn is_valid(&self) -> bool {
        self.fd.is_some()
    }

    fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        let fd = self.fd_mut(Op::Read)?;
        let n = loop {
            match fd.read(buf) {
                Ok(n) => break n,
                // EINTR is not a retry policy, the call never started
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamError::transport(Op::Read, e)),
            }
        };
        self.transferred += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> StreamResult<usize> {
        let fd = self.fd_mut(Op::Write)?;
        let n = loop {
            match fd.write(buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamError::transport(Op::Write, e)),
            }
        };
        self.transferred += n as u64;
        Ok(n)
    }

    fn seek(&mut self, pos: u64) -> StreamResult<u64> {
        self.file_mut(Op::Seek)?
            .seek(SeekFrom::Start(pos))
            .map_err(|e| StreamError::transport(Op::Seek, e))
    }

    fn tell(&mut self) -> StreamResult<u64> {
        self.file_mut(Op::Tell)?
            .stream_position()
            .map_err(|e| StreamError::transport(Op::Tell, e))
    }

    fn close(&mut self) -> StreamResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if !self.flags.contains(IoFlags::FD_CLOSE) {
            debug!("[FD] close without FD_CLOSE, descriptor left open");
            return Ok(());
        }
        if let Some(fd) = self.fd.take() {
            // sockets get an orderly shutdown so the peer sees EOF even if dup'd elsewhere
            if fd.is_socket() && !self.borrowed {
                let res = match &fd {
                    Descriptor::Tcp(s) => s.shutdown(Shutdown::Both),
                    #[cfg(unix)]
                    Descriptor::Unix(s) => s.shutdown(Shutdown::Both),
                    Descriptor::File(_) => Ok(()),
                };
                if let Err(e) = res {
                    if e.kind() != io::ErrorKind::NotConnected {
                        return Err(StreamError::transport(Op::Close, e));
                    }
                }
            }
            drop(fd);
        }
        Ok(())
    }

    fn free(&mut self) {
        let Some(fd) = self.fd.take() else { return };
        if self.flags.contains(IoFlags::FD_CLOSE) {
            drop(fd);
        } else {
            // not ours to close: give up the handle without closing the OS descriptor
            debug!("[FD] free without FD_CLOSE, descriptor handed back open");
            std::mem::forget(fd);
        }
    }

    fn size(&self) -> Option<u64> {
        match &self.fd {
            Some(Descriptor::File(f)) => f.metadata().ok().map(|m| m.len()),
            Some(_) => Some(self.transferred),
            None => None,
        }
    }
}
