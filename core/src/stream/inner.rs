//! stream/inner.rs
//! State shared by every handle of one stream, and the buffer plumbing between the
//! caller, the codec chain and the transport.
//!
//! Buffers:
//! - `rbuf`: raw bytes read from the transport, not yet delivered or decoded.
//! - `pushback`: chain output not yet delivered. Always drained first.
//! - `wbuf`: bytes ready for the transport (chain output on write streams).

use std::io;

use bytes::{Buf, BytesMut};
use log::{debug, trace, warn};

use crate::codec::{ChainDirection, CodecChain, FlushMode};
use crate::stream::config::StreamConfig;
use crate::telemetry::StreamCounters;
use crate::transport::{Backend, Transport};
use crate::types::{Op, StreamError, StreamResult};
use crate::utils::{copy_into, find_byte};

pub(crate) struct StreamInner {
    pub(crate) transport: Backend,
    pub(crate) config: StreamConfig,
    pub(crate) chain: CodecChain,
    rbuf: BytesMut,
    pushback: BytesMut,
    wbuf: BytesMut,
    scratch: Vec<u8>,
    eof: bool,
    transport_closed: bool,
    /// Handles that have not been closed yet.
    pub(crate) open_handles: usize,
    pub(crate) counters: StreamCounters,
}

impl StreamInner {
    pub(crate) fn new(transport: Backend, config: StreamConfig) -> Self {
        Self {
            chain: CodecChain::new(config.staging_size),
            rbuf: BytesMut::with_capacity(config.rbuf_size),
            pushback: BytesMut::new(),
            wbuf: BytesMut::with_capacity(config.wbuf_size),
            scratch: vec![0u8; config.rbuf_size],
            eof: false,
            transport_closed: false,
            open_handles: 1,
            counters: StreamCounters::default(),
            transport,
            config,
        }
    }

    pub(crate) fn label(&self) -> String {
        match &self.config.name {
            Some(n) => format!("{}:{}", self.transport.kind(), n),
            None => self.transport.kind().to_string(),
        }
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.eof && self.pushback.is_empty() && self.rbuf.is_empty()
    }

    pub(crate) fn has_unread(&self) -> bool {
        !self.rbuf.is_empty() || !self.pushback.is_empty()
    }

    pub(crate) fn pending_output(&self) -> usize {
        self.wbuf.len()
    }

    /// (undelivered input, unwritten output) byte counts.
    pub(crate) fn read_ahead(&self) -> (usize, usize) {
        (self.rbuf.len() + self.pushback.len(), self.wbuf.len())
    }

    // ---------------------------------------------------------------------
    // Read path
    // ---------------------------------------------------------------------

    /// One transport read into `rbuf`; 0 marks end of stream.
    fn read_transport(&mut self) -> StreamResult<usize> {
        let n = self.transport.read(&mut self.scratch)?;
        self.counters.add_transport_read(n);
        trace!("[STREAM {}] transport read {} bytes", self.label(), n);
        if n == 0 {
            self.eof = true;
        } else {
            self.rbuf.extend_from_slice(&self.scratch[..n]);
        }
        Ok(n)
    }

    /// Decode through the chain until some output is available in `pushback`
    /// or the chain has been finalized at end of stream.
    fn fill_decoded(&mut self) -> StreamResult<()> {
        loop {
            if !self.pushback.is_empty() {
                return Ok(());
            }
            if !self.rbuf.is_empty() {
                let raw = self.rbuf.split();
                self.chain.transform(ChainDirection::Read, &raw, &mut self.pushback)?;
                continue;
            }
            if self.eof {
                if self.chain.is_finalized() {
                    return Ok(());
                }
                self.chain.flush(ChainDirection::Read, FlushMode::Complete, &mut self.pushback)?;
                self.counters.add_chain_flush();
                continue;
            }
            self.read_transport()?;
        }
    }

    /// Bytes ready for delivery: pushback if it holds anything, otherwise decoded
    /// chain output or raw input. Empty only at end of stream.
    pub(crate) fn fill_buf(&mut self) -> StreamResult<&[u8]> {
        if self.pushback.is_empty() {
            if self.chain.is_empty() {
                if self.rbuf.is_empty() && !self.eof {
                    self.read_transport()?;
                }
            } else {
                self.chain.lock(ChainDirection::Read)?;
                self.fill_decoded()?;
            }
        }
        if !self.pushback.is_empty() {
            Ok(&self.pushback[..])
        } else {
            Ok(&self.rbuf[..])
        }
    }

    pub(crate) fn consume(&mut self, n: usize) {
        if !self.pushback.is_empty() {
            self.pushback.advance(n);
        } else {
            self.rbuf.advance(n);
        }
        self.counters.add_delivered(n);
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = {
            let src = self.fill_buf()?;
            copy_into(buf, src)
        };
        self.consume(n);
        Ok(n)
    }

    /// Append bytes up to and including `delim` to `out`, at most `max` bytes.
    /// Nothing past the delimiter is consumed.
    pub(crate) fn read_until(&mut self, delim: u8, max: usize, out: &mut Vec<u8>) -> StreamResult<usize> {
        let mut total = 0;
        while total < max {
            let (n, done) = {
                let avail = self.fill_buf()?;
                if avail.is_empty() {
                    break;
                }
                let window = &avail[..avail.len().min(max - total)];
                let (n, done) = match find_byte(window, delim) {
                    Some(i) => (i + 1, true),
                    None => (window.len(), false),
                };
                out.extend_from_slice(&window[..n]);
                (n, done)
            };
            self.consume(n);
            total += n;
            if done {
                break;
            }
        }
        Ok(total)
    }

    /// Drop everything read ahead; the next read goes to the transport.
    pub(crate) fn discard_input(&mut self) {
        if self.has_unread() {
            debug!(
                "[STREAM {}] discarding {} raw + {} decoded bytes of read-ahead",
                self.label(),
                self.rbuf.len(),
                self.pushback.len()
            );
        }
        self.rbuf.clear();
        self.pushback.clear();
        self.eof = false;
    }

    // ---------------------------------------------------------------------
    // Write path
    // ---------------------------------------------------------------------

    pub(crate) fn write(&mut self, data: &[u8]) -> StreamResult<usize> {
        if self.chain.is_empty() {
            self.wbuf.extend_from_slice(data);
        } else {
            self.chain.transform(ChainDirection::Write, data, &mut self.wbuf)?;
        }
        self.counters.add_accepted(data.len());
        if self.wbuf.len() >= self.config.wbuf_size {
            self.drain_output()?;
        }
        Ok(data.len())
    }

    /// Write the whole output buffer to the transport. A transport that accepts
    /// nothing is an error, not a retry.
    pub(crate) fn drain_output(&mut self) -> StreamResult<usize> {
        let mut written = 0;
        while !self.wbuf.is_empty() {
            let n = self.transport.write(&self.wbuf)?;
            if n == 0 {
                return Err(StreamError::transport(
                    Op::Write,
                    io::Error::new(io::ErrorKind::WriteZero, "transport accepted no bytes"),
                ));
            }
            self.counters.add_transport_write(n);
            self.wbuf.advance(n);
            written += n;
        }
        Ok(written)
    }

    fn serves_writes(&self) -> bool {
        self.chain.direction() == Some(ChainDirection::Write)
    }

    /// Chunk-flush a write chain, then push the output buffer out.
    pub(crate) fn flush(&mut self) -> StreamResult<usize> {
        if self.serves_writes() {
            self.chain.flush(ChainDirection::Write, FlushMode::Chunk, &mut self.wbuf)?;
            self.counters.add_chain_flush();
        }
        self.drain_output()
    }

    /// End-of-stream finalize of the chain as a write chain, then push the output
    /// buffer out. A chain that never saw a byte is finalized too, so an empty body
    /// still gets its container framing. A read chain is left alone.
    pub(crate) fn finish(&mut self) -> StreamResult<usize> {
        let finalize = !self.chain.is_empty()
            && !self.chain.is_finalized()
            && self.chain.direction() != Some(ChainDirection::Read);
        if finalize {
            self.chain.flush(ChainDirection::Write, FlushMode::Complete, &mut self.wbuf)?;
            self.counters.add_chain_flush();
        }
        self.drain_output()
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    pub(crate) fn is_transport_closed(&self) -> bool {
        self.transport_closed
    }

    /// Finalize pending output and close the transport. Runs once; later calls are no-ops.
    /// The transport is closed even when the final flush fails.
    pub(crate) fn shutdown(&mut self) -> StreamResult<()> {
        if self.transport_closed {
            return Ok(());
        }
        // only a chain that already carried writes is finalized implicitly
        let flushed = if self.serves_writes() { self.finish() } else { self.drain_output() };
        self.transport_closed = true;
        let closed = self.transport.close();
        self.counters.add_close();
        debug!(
            "[STREAM {}] closed ({} bytes in, {} bytes out)",
            self.label(),
            self.counters.bytes_from_transport,
            self.counters.bytes_to_transport
        );
        flushed.and(closed)
    }
}

impl Drop for StreamInner {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("[STREAM {}] close during teardown failed: {}", self.label(), e);
        }
        self.chain.clear();
        self.transport.free();
    }
}
