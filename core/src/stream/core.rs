//! stream/core.rs
//! `Stream`: the caller-facing handle.
//!
//! Design notes:
//! - Every handle shares one `StreamInner` through `Rc<RefCell<..>>`. `dup` hands out
//!   another handle; the stream is single-threaded and the handle is neither `Send`
//!   nor `Sync`.
//! - `close` retires one handle. Only the last open handle finalizes pending output
//!   and closes the transport. Dropping it does the same, best effort. Stages and the
//!   transport are released when the last handle of any kind goes away.
//! - Attaching on the write side flushes first; attaching on the read side is refused
//!   while undelivered input is buffered.

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use log::{debug, warn};

use crate::codec::{ChainDirection, Codec, Position};
use crate::stream::config::StreamConfig;
use crate::stream::inner::StreamInner;
use crate::telemetry::StreamCounters;
use crate::transport::{
    Backend, Descriptor, FdTransport, IoFlags, MemTransport, SecureChannel, SecureTransport,
    Transport, TransportKind,
};
use crate::types::{StreamError, StreamResult};

pub struct Stream {
    shared: Rc<RefCell<StreamInner>>,
    closed: bool,
}

impl Stream {
    // ---------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------

    /// Stream over any transport with default buffer sizes and an empty chain.
    pub fn create(transport: impl Into<Backend>) -> StreamResult<Self> {
        Self::with_config(transport, StreamConfig::default())
    }

    pub fn with_config(transport: impl Into<Backend>, config: StreamConfig) -> StreamResult<Self> {
        config.validate()?;
        let transport = transport.into();
        if !transport.is_valid() {
            return Err(StreamError::InvalidArgument(format!(
                "{} transport has no usable handle",
                transport.kind()
            )));
        }
        let inner = StreamInner::new(transport, config);
        debug!("[STREAM {}] created", inner.label());
        Ok(Self { shared: Rc::new(RefCell::new(inner)), closed: false })
    }

    /// Descriptor stream; `IoFlags::FD_CLOSE` decides whether close closes it.
    pub fn from_fd(fd: impl Into<Descriptor>, flags: IoFlags) -> StreamResult<Self> {
        Self::create(FdTransport::new(fd, flags))
    }

    /// Stream-owned growable memory buffer holding `data`.
    pub fn memory(data: Vec<u8>) -> StreamResult<Self> {
        Self::create(MemTransport::owned(data))
    }

    /// Memory buffer the caller keeps access to.
    pub fn shared_memory(buf: Rc<RefCell<Vec<u8>>>) -> StreamResult<Self> {
        Self::create(MemTransport::shared(buf))
    }

    /// Stream over an already-established secure session.
    pub fn secure(chan: Box<dyn SecureChannel>) -> StreamResult<Self> {
        Self::create(SecureTransport::new(chan))
    }

    // ---------------------------------------------------------------------
    // Shared lifetime
    // ---------------------------------------------------------------------

    /// Another handle on the same buffers, chain and transport.
    pub fn dup(&self) -> StreamResult<Stream> {
        if self.closed {
            return Err(StreamError::InvalidState("dup of a closed stream handle".into()));
        }
        self.borrow_inner()?.open_handles += 1;
        Ok(Stream { shared: Rc::clone(&self.shared), closed: false })
    }

    /// Number of live handles.
    pub fn share_count(&self) -> usize {
        Rc::strong_count(&self.shared)
    }

    /// Retire this handle. The last open holder flushes pending writes (finalizing a
    /// write chain) and closes the transport. Calling it again is a no-op.
    pub fn close(&mut self) -> StreamResult<()> {
        if !self.retire() {
            return Ok(());
        }
        let mut inner = self.borrow_inner()?;
        inner.shutdown()
    }

    /// Release this handle. When it is the last open one the stream is torn down;
    /// unlike dropping, a failure of the final flush or close is reported.
    pub fn free(mut self) -> StreamResult<()> {
        let res = if self.retire() { self.borrow_inner()?.shutdown() } else { Ok(()) };
        drop(self);
        res
    }

    /// Mark this handle closed; true when no other open handle remains.
    fn retire(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        match self.shared.try_borrow_mut() {
            Ok(mut inner) => {
                inner.open_handles = inner.open_handles.saturating_sub(1);
                inner.open_handles == 0
            }
            Err(_) => false,
        }
    }

    fn borrow_inner(&self) -> StreamResult<RefMut<'_, StreamInner>> {
        self.shared
            .try_borrow_mut()
            .map_err(|_| StreamError::InvalidState("stream re-entered while busy".into()))
    }

    /// Borrow the shared state for an I/O operation on an open handle.
    pub(crate) fn inner(&self) -> StreamResult<RefMut<'_, StreamInner>> {
        if self.closed {
            return Err(StreamError::InvalidState("stream handle is closed".into()));
        }
        let inner = self.borrow_inner()?;
        if inner.is_transport_closed() {
            return Err(StreamError::InvalidState("stream transport is closed".into()));
        }
        Ok(inner)
    }

    // ---------------------------------------------------------------------
    // Codec chain
    // ---------------------------------------------------------------------

    /// Insert a codec at the head (nearest the transport) or the tail (nearest the caller).
    pub fn codec_attach(&mut self, codec: Box<dyn Codec>, pos: Position) -> StreamResult<()> {
        let mut inner = self.inner()?;
        if inner.has_unread() {
            return Err(StreamError::InvalidState(
                "unread input is buffered and cannot be attributed to the new codec".into(),
            ));
        }
        if inner.pending_output() > 0 || inner.chain.direction().is_some() {
            inner.flush()?;
        }
        let name = codec.name();
        inner.chain.attach(codec, pos)?;
        debug!("[STREAM {}] codec '{}' attached at {:?}", inner.label(), name, pos);
        Ok(())
    }

    /// Finalize and detach every codec. On a write stream the trailing output is
    /// written to the transport; on a read stream already-decoded bytes stay readable.
    pub fn codecs_remove(&mut self) -> StreamResult<()> {
        let mut inner = self.inner()?;
        if inner.chain.is_empty() {
            return Ok(());
        }
        if inner.chain.direction() == Some(ChainDirection::Write) {
            inner.finish()?;
        }
        debug!("[STREAM {}] removing codecs {:?}", inner.label(), inner.chain.names());
        inner.chain.clear();
        Ok(())
    }

    pub fn codec_count(&self) -> usize {
        self.shared.borrow().chain.len()
    }

    /// Codec names, head first.
    pub fn codec_names(&self) -> Vec<&'static str> {
        self.shared.borrow().chain.names()
    }

    // ---------------------------------------------------------------------
    // Positioning
    // ---------------------------------------------------------------------

    /// Absolute seek. Pending writes go out first, read-ahead and pushback are dropped.
    pub fn seek(&mut self, pos: u64) -> StreamResult<u64> {
        let mut inner = self.inner()?;
        if inner.chain.is_stateful() {
            return Err(StreamError::InvalidState(
                "cannot seek with a stateful codec attached".into(),
            ));
        }
        if inner.transport.kind() == TransportKind::Secure {
            return Err(StreamError::Unsupported("seek on a secure channel".into()));
        }
        inner.drain_output()?;
        let p = inner.transport.seek(pos)?;
        inner.discard_input();
        Ok(p)
    }

    /// Logical position as seen by the caller: transport position minus unread
    /// read-ahead plus unwritten output.
    pub fn tell(&mut self) -> StreamResult<u64> {
        let mut inner = self.inner()?;
        if inner.chain.is_stateful() {
            return Err(StreamError::InvalidState(
                "position is undefined with a stateful codec attached".into(),
            ));
        }
        let pos = inner.transport.tell()?;
        let (ahead, pending) = inner.read_ahead();
        Ok((pos + pending as u64).saturating_sub(ahead as u64))
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn is_secure(&self) -> bool {
        self.shared.borrow().transport.is_secure()
    }

    pub fn kind(&self) -> TransportKind {
        self.shared.borrow().transport.kind()
    }

    /// True once the transport reported end of stream and everything was delivered.
    pub fn eof(&self) -> bool {
        self.shared.borrow().is_eof()
    }

    pub fn is_closed(&self) -> bool {
        self.closed || self.shared.borrow().is_transport_closed()
    }

    pub fn name(&self) -> Option<String> {
        self.shared.borrow().config.name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.shared.borrow_mut().config.name = Some(name.into());
    }

    /// Logical size of the transport, if it has one.
    pub fn size(&self) -> Option<u64> {
        self.shared.borrow().transport.size()
    }

    /// Total bytes read from the transport so far.
    pub fn read_total(&self) -> u64 {
        self.shared.borrow().counters.bytes_from_transport
    }

    pub fn counters(&self) -> StreamCounters {
        self.shared.borrow().counters
    }

    pub fn config(&self) -> StreamConfig {
        self.shared.borrow().config.clone()
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if !self.retire() {
            return;
        }
        if let Ok(mut inner) = self.shared.try_borrow_mut() {
            if let Err(e) = inner.shutdown() {
                warn!("[STREAM {}] close on drop failed: {}", inner.label(), e);
            }
        }
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.shared.try_borrow() {
            Ok(inner) => f
                .debug_struct("Stream")
                .field("transport", &inner.transport.kind())
                .field("name", &inner.config.name)
                .field("chain", &inner.chain)
                .field("share_count", &Rc::strong_count(&self.shared))
                .field("closed", &self.closed)
                .finish(),
            Err(_) => f.debug_struct("Stream").field("busy", &true).finish(),
        }
    }
}
