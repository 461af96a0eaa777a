//! stream/io.rs
//! Byte, line and copy operations on `Stream`, plus `std::io` interop.

use std::io;

use crate::stream::core::Stream;
use crate::types::StreamResult;

impl Stream {
    /// Deliver up to `buf.len()` bytes; 0 on clean end of stream.
    ///
    /// Pushback is served first; a read never mixes sources, so a short count does
    /// not mean end of stream.
    pub fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        self.inner()?.read(buf)
    }

    /// Read exactly `buf.len()` bytes unless end of stream comes first.
    pub fn read_full(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        let mut inner = self.inner()?;
        let mut got = 0;
        while got < buf.len() {
            let n = inner.read(&mut buf[got..])?;
            if n == 0 {
                break;
            }
            got += n;
        }
        Ok(got)
    }

    /// Append one line (with its `\n`) to `out`, bounded by the configured `max_line`.
    /// Returns the bytes appended, 0 at end of stream.
    pub fn getline(&mut self, out: &mut Vec<u8>) -> StreamResult<usize> {
        let mut inner = self.inner()?;
        let max = inner.config.max_line;
        inner.read_until(b'\n', max, out)
    }

    /// Append bytes up to and including `delim`, at most `max` of them.
    pub fn get_until(&mut self, delim: u8, max: usize, out: &mut Vec<u8>) -> StreamResult<usize> {
        self.inner()?.read_until(delim, max, out)
    }

    pub fn getc(&mut self) -> StreamResult<Option<u8>> {
        let mut b = [0u8; 1];
        match self.inner()?.read(&mut b)? {
            0 => Ok(None),
            _ => Ok(Some(b[0])),
        }
    }

    /// Accept `data` into the stream. All of it is taken; the transport sees it once
    /// the output buffer fills or on flush.
    pub fn write(&mut self, data: &[u8]) -> StreamResult<usize> {
        self.inner()?.write(data)
    }

    pub fn putc(&mut self, b: u8) -> StreamResult<()> {
        self.inner()?.write(&[b]).map(|_| ())
    }

    /// Drain the chain without finalizing it and write everything buffered.
    /// Returns the bytes physically written to the transport.
    pub fn flush(&mut self) -> StreamResult<usize> {
        self.inner()?.flush()
    }

    /// Finalize the write chain (trailers, padding) and write everything buffered,
    /// leaving the transport open.
    pub fn finish(&mut self) -> StreamResult<usize> {
        self.inner()?.finish()
    }
}

/// Move up to `n` bytes from `src` to `dst`. Returns the count moved, short only at
/// end of `src`.
pub fn copy(dst: &mut Stream, src: &mut Stream, n: u64) -> StreamResult<u64> {
    let mut buf = [0u8; 4096];
    let mut moved = 0u64;
    while moved < n {
        let want = (n - moved).min(buf.len() as u64) as usize;
        let got = src.read(&mut buf[..want])?;
        if got == 0 {
            break;
        }
        dst.write(&buf[..got])?;
        moved += got as u64;
    }
    Ok(moved)
}

/// Move everything from `src` to `dst` until end of stream.
pub fn pipe(dst: &mut Stream, src: &mut Stream) -> StreamResult<u64> {
    copy(dst, src, u64::MAX)
}

impl io::Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Stream::read(self, buf).map_err(Into::into)
    }
}

impl io::Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Stream::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        Stream::flush(self).map(|_| ()).map_err(Into::into)
    }
}
