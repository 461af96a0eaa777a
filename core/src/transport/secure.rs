//! transport/secure.rs
//! Secure-channel transport. The handshake happens before the stream is created;
//! this layer only moves application bytes and performs the orderly shutdown.
//!
//! Industry notes:
//! - With the `tls` feature, rustls `StreamOwned` (server or client side) plugs in
//!   directly as a [`SecureChannel`].
//! - Random access makes no sense on a record-oriented channel: seek/tell are unsupported.

use std::io::{self, Read, Write};

use log::{debug, warn};

use crate::transport::{Transport, TransportKind};
use crate::types::{Op, StreamError, StreamResult};

/// An established secure session that can be shut down cleanly.
pub trait SecureChannel: Read + Write {
    /// Send the close notification and push any pending records out.
    fn shutdown(&mut self) -> io::Result<()>;
}

#[cfg(feature = "tls")]
impl<T: Read + Write> SecureChannel for rustls::StreamOwned<rustls::ServerConnection, T> {
    fn shutdown(&mut self) -> io::Result<()> {
        self.conn.send_close_notify();
        while self.conn.wants_write() {
            self.conn.write_tls(&mut self.sock)?;
        }
        self.sock.flush()
    }
}

#[cfg(feature = "tls")]
impl<T: Read + Write> SecureChannel for rustls::StreamOwned<rustls::ClientConnection, T> {
    fn shutdown(&mut self) -> io::Result<()> {
        self.conn.send_close_notify();
        while self.conn.wants_write() {
            self.conn.write_tls(&mut self.sock)?;
        }
        self.sock.flush()
    }
}

pub struct SecureTransport {
    chan: Option<Box<dyn SecureChannel>>,
    closed: bool,
    transferred: u64,
}

impl SecureTransport {
    pub fn new(chan: Box<dyn SecureChannel>) -> Self {
        Self { chan: Some(chan), closed: false, transferred: 0 }
    }

    fn chan_mut(&mut self, op: Op) -> StreamResult<&mut Box<dyn SecureChannel>> {
        if self.closed {
            return Err(StreamError::InvalidState(format!("secure {} after close", op)));
        }
        self.chan
            .as_mut()
            .ok_or_else(|| StreamError::InvalidState(format!("secure {} on a released channel", op)))
    }
}

impl Transport for SecureTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Secure
    }

    fn is_valid(&self) -> bool {
        self.chan.is_some()
    }

    fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        let chan = self.chan_mut(Op::Read)?;
        let n = chan.read(buf).map_err(|e| {
            // peer dropped the socket without a close notification
            if e.kind() == io::ErrorKind::UnexpectedEof {
                warn!("[SECURE] peer closed without close_notify");
            }
            StreamError::transport(Op::Read, e)
        })?;
        self.transferred += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> StreamResult<usize> {
        let chan = self.chan_mut(Op::Write)?;
        let n = chan.write(buf).map_err(|e| StreamError::transport(Op::Write, e))?;
        chan.flush().map_err(|e| StreamError::transport(Op::Write, e))?;
        self.transferred += n as u64;
        Ok(n)
    }

    fn seek(&mut self, _pos: u64) -> StreamResult<u64> {
        Err(StreamError::Unsupported("seek on a secure channel".into()))
    }

    fn tell(&mut self) -> StreamResult<u64> {
        Err(StreamError::Unsupported("tell on a secure channel".into()))
    }

    fn close(&mut self) -> StreamResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(chan) = self.chan.as_mut() {
            debug!("[SECURE] shutdown after {} application bytes", self.transferred);
            chan.shutdown().map_err(|e| StreamError::transport(Op::Close, e))?;
        }
        Ok(())
    }

    fn free(&mut self) {
        self.chan = None;
    }

    fn is_secure(&self) -> bool {
        true
    }

    fn size(&self) -> Option<u64> {
        Some(self.transferred)
    }
}
