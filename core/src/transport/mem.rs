//! transport/mem.rs
//! Memory transport over an owned or caller-shared byte buffer.
//!
//! One cursor serves both reads and writes, like a file. A write at the cursor
//! overwrites existing bytes and extends the buffer past the end unless it is fixed.

use std::cell::RefCell;
use std::rc::Rc;

use crate::transport::{IoFlags, Transport, TransportKind};
use crate::types::{StreamError, StreamResult};

#[derive(Debug)]
pub enum MemBuffer {
    /// Released with the transport.
    Owned(Vec<u8>),
    /// The caller keeps a handle and can inspect the bytes after the stream is gone.
    Shared(Rc<RefCell<Vec<u8>>>),
}

impl MemBuffer {
    fn len(&self) -> usize {
        match self {
            MemBuffer::Owned(v) => v.len(),
            MemBuffer::Shared(v) => v.borrow().len(),
        }
    }

    fn with_mut<R>(&mut self, f: impl FnOnce(&mut Vec<u8>) -> R) -> R {
        match self {
            MemBuffer::Owned(v) => f(v),
            MemBuffer::Shared(v) => f(&mut v.borrow_mut()),
        }
    }
}

#[derive(Debug)]
pub struct MemTransport {
    buf: MemBuffer,
    pos: usize,
    flags: IoFlags,
    /// Upper bound on the length when `MEM_FIXED` is set.
    limit: usize,
    closed: bool,
    released: bool,
}

impl MemTransport {
    pub fn new(buf: MemBuffer, flags: IoFlags) -> Self {
        let limit = buf.len();
        Self { buf, pos: 0, flags, limit, closed: false, released: false }
    }

    /// Growable, stream-owned buffer holding `data` with the cursor at 0.
    pub fn owned(data: Vec<u8>) -> Self {
        Self::new(MemBuffer::Owned(data), IoFlags::MEM_FREEBUF)
    }

    /// Growable buffer the caller can read back once the stream is done.
    pub fn shared(buf: Rc<RefCell<Vec<u8>>>) -> Self {
        Self::new(MemBuffer::Shared(buf), IoFlags::empty())
    }

    /// Fixed-capacity buffer: writes past `capacity` are short.
    pub fn fixed(capacity: usize) -> Self {
        let mut t = Self::new(MemBuffer::Owned(Vec::with_capacity(capacity)), IoFlags::MEM_FIXED);
        t.limit = capacity;
        t
    }

    pub fn flags(&self) -> IoFlags {
        self.flags
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Copy of the current contents.
    pub fn contents(&self) -> Vec<u8> {
        match &self.buf {
            MemBuffer::Owned(v) => v.clone(),
            MemBuffer::Shared(v) => v.borrow().clone(),
        }
    }

    /// The owner of a shared buffer may shrink it under us; never point past the end.
    fn clamp_cursor(&mut self) {
        self.pos = self.pos.min(self.buf.len());
    }

    fn check_open(&self, what: &str) -> StreamResult<()> {
        if self.closed || self.released {
            return Err(StreamError::InvalidState(format!("mem {} after close", what)));
        }
        Ok(())
    }
}

impl Transport for MemTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Memory
    }

    fn is_valid(&self) -> bool {
        !self.released
    }

    fn read(&mut self, out: &mut [u8]) -> StreamResult<usize> {
        self.check_open("read")?;
        self.clamp_cursor();
        let pos = self.pos;
        let n = self.buf.with_mut(|v| {
            let avail = v.len().saturating_sub(pos);
            let n = avail.min(out.len());
            out[..n].copy_from_slice(&v[pos..pos + n]);
            n
        });
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> StreamResult<usize> {
        self.check_open("write")?;
        self.clamp_cursor();
        let pos = self.pos;
        let cap = if self.flags.contains(IoFlags::MEM_FIXED) {
            self.limit.saturating_sub(pos).min(data.len())
        } else {
            data.len()
        };
        self.buf.with_mut(|v| {
            let end = pos + cap;
            if v.len() < end {
                v.resize(end, 0);
            }
            v[pos..end].copy_from_slice(&data[..cap]);
        });
        self.pos += cap;
        Ok(cap)
    }

    fn seek(&mut self, pos: u64) -> StreamResult<u64> {
        self.check_open("seek")?;
        let len = self.buf.len() as u64;
        if pos > len {
            return Err(StreamError::InvalidArgument(format!(
                "seek to {} past end of {}-byte memory buffer",
                pos, len
            )));
        }
        self.pos = pos as usize;
        Ok(pos)
    }

    fn tell(&mut self) -> StreamResult<u64> {
        self.check_open("tell")?;
        self.clamp_cursor();
        Ok(self.pos as u64)
    }

    fn close(&mut self) -> StreamResult<()> {
        self.closed = true;
        Ok(())
    }

    fn free(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match &mut self.buf {
            MemBuffer::Owned(v) => *v = Vec::new(),
            MemBuffer::Shared(v) if self.flags.contains(IoFlags::MEM_FREEBUF) => {
                *v.borrow_mut() = Vec::new();
            }
            MemBuffer::Shared(_) => {}
        }
    }

    fn size(&self) -> Option<u64> {
        Some(self.buf.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_buffer_takes_a_short_write() {
        let mut t = MemTransport::fixed(4);
        assert_eq!(t.write(b"abcdef").unwrap(), 4);
        assert_eq!(t.write(b"g").unwrap(), 0);
        assert_eq!(t.contents(), b"abcd");
    }

    #[test]
    fn shared_buffer_survives_free_without_freebuf() {
        let buf = Rc::new(RefCell::new(Vec::new()));
        let mut t = MemTransport::shared(Rc::clone(&buf));
        t.write(b"kept").unwrap();
        t.close().unwrap();
        t.free();
        assert_eq!(&*buf.borrow(), b"kept");
    }

    #[test]
    fn owner_truncating_a_shared_buffer_pulls_the_cursor_back() {
        let buf = Rc::new(RefCell::new(b"0123456789".to_vec()));
        let mut t = MemTransport::shared(Rc::clone(&buf));
        assert_eq!(t.seek(5).unwrap(), 5);
        buf.borrow_mut().truncate(2);

        let mut out = [0u8; 4];
        assert_eq!(t.read(&mut out).unwrap(), 0);
        assert_eq!(t.tell().unwrap(), 2);
        assert!(t.seek(5).is_err());

        t.write(b"xy").unwrap();
        assert_eq!(&*buf.borrow(), b"01xy");
    }
}
