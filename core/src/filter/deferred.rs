//! filter/deferred.rs
//! Write-side stage that holds back early response output so the owner can still
//! change response metadata, then emits the owner's header bytes ahead of the body.
//!
//! State machine:
//! - BUFFERING: input is kept while the total stays within the threshold.
//! - DRAINING: entered when the threshold is exceeded, on any flush, or on the first
//!   transform after the owner supplied headers. Headers go out first, then the held
//!   bytes, then everything else unchanged.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::codec::{Codec, CodecError, FlushMode, Flushed, Transformed};
use crate::constants::DEFAULT_DEFERRED_THRESHOLD;
use crate::utils::copy_into;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    Buffering,
    Draining,
}

type HeaderProvider = Box<dyn FnMut() -> Vec<u8>>;

struct Shared {
    state: FilterState,
    fed: bool,
    headers: Option<Vec<u8>>,
    provider: Option<HeaderProvider>,
}

/// Owner-side view of a [`DeferredHeaderFilter`] attached to a stream.
///
/// Single-threaded like the stream itself.
#[derive(Clone)]
pub struct FilterHandle {
    shared: Rc<RefCell<Shared>>,
}

impl FilterHandle {
    /// True once the application wrote at least one byte.
    pub fn has_been_fed(&self) -> bool {
        self.shared.borrow().fed
    }

    pub fn state(&self) -> FilterState {
        self.shared.borrow().state
    }

    pub fn is_draining(&self) -> bool {
        self.state() == FilterState::Draining
    }

    /// Supply header bytes out of band. They are emitted ahead of the held body on the
    /// next write or flush through the stream.
    pub fn set_headers(&self, headers: Vec<u8>) -> Result<(), CodecError> {
        let mut s = self.shared.borrow_mut();
        if s.state == FilterState::Draining {
            return Err(CodecError::InvalidState(
                "headers already emitted, output is draining".into(),
            ));
        }
        s.headers = Some(headers);
        Ok(())
    }

    /// Called at the moment draining starts if no headers were supplied explicitly.
    pub fn set_header_provider<F>(&self, provider: F)
    where
        F: FnMut() -> Vec<u8> + 'static,
    {
        self.shared.borrow_mut().provider = Some(Box::new(provider));
    }
}

impl fmt::Debug for FilterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.shared.borrow();
        f.debug_struct("FilterHandle")
            .field("state", &s.state)
            .field("fed", &s.fed)
            .field("headers", &s.headers.as_ref().map(|h| h.len()))
            .finish()
    }
}

pub struct DeferredHeaderFilter {
    shared: Rc<RefCell<Shared>>,
    threshold: usize,
    held: Vec<u8>,
    /// Headers + held body waiting for room once draining started.
    out: Vec<u8>,
    out_off: usize,
}

impl DeferredHeaderFilter {
    pub fn new(threshold: usize) -> (Self, FilterHandle) {
        let shared = Rc::new(RefCell::new(Shared {
            state: FilterState::Buffering,
            fed: false,
            headers: None,
            provider: None,
        }));
        let filter = Self {
            shared: Rc::clone(&shared),
            threshold,
            held: Vec::with_capacity(threshold),
            out: Vec::new(),
            out_off: 0,
        };
        (filter, FilterHandle { shared })
    }

    pub fn with_default_threshold() -> (Self, FilterHandle) {
        Self::new(DEFAULT_DEFERRED_THRESHOLD)
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    fn state(&self) -> FilterState {
        self.shared.borrow().state
    }

    fn start_draining(&mut self, reason: &str) {
        let (explicit, provider) = {
            let mut s = self.shared.borrow_mut();
            s.state = FilterState::Draining;
            (s.headers.take(), s.provider.take())
        };
        // provider runs without the borrow held, it may query the handle
        let headers = match (explicit, provider) {
            (Some(h), _) => h,
            (None, Some(mut p)) => p(),
            (None, None) => Vec::new(),
        };
        debug!(
            "[FILTER] draining ({}): {} header bytes, {} held bytes",
            reason,
            headers.len(),
            self.held.len()
        );
        self.out = headers;
        self.out.append(&mut self.held);
        self.out_off = 0;
    }

    fn drain_out(&mut self, dst: &mut [u8]) -> usize {
        let n = copy_into(dst, &self.out[self.out_off..]);
        self.out_off += n;
        if self.out_off == self.out.len() {
            self.out.clear();
            self.out_off = 0;
        }
        n
    }

    fn out_pending(&self) -> bool {
        self.out_off < self.out.len()
    }
}

impl Codec for DeferredHeaderFilter {
    fn name(&self) -> &'static str {
        "deferred-header"
    }

    fn transform(&mut self, src: &[u8], dst: &mut [u8]) -> Result<Transformed, CodecError> {
        if !src.is_empty() {
            self.shared.borrow_mut().fed = true;
        }

        if self.state() == FilterState::Buffering {
            let headers_ready = self.shared.borrow().headers.is_some();
            if headers_ready {
                self.start_draining("headers supplied");
            } else if self.held.len() + src.len() <= self.threshold {
                self.held.extend_from_slice(src);
                return Ok(Transformed::new(src.len(), 0));
            } else {
                self.start_draining("threshold exceeded");
            }
        }

        let mut produced = self.drain_out(dst);
        if self.out_pending() {
            return Ok(Transformed::new(0, produced));
        }
        let consumed = copy_into(&mut dst[produced..], src);
        produced += consumed;
        Ok(Transformed::new(consumed, produced))
    }

    fn flush(&mut self, dst: &mut [u8], mode: FlushMode) -> Result<Flushed, CodecError> {
        if self.state() == FilterState::Buffering {
            self.start_draining(match mode {
                FlushMode::Chunk => "flush",
                FlushMode::Complete => "end of stream",
            });
        }
        let produced = self.drain_out(dst);
        if self.out_pending() {
            return Ok(Flushed::more(produced));
        }
        Ok(Flushed::done(produced))
    }

    fn release(&mut self) {
        self.shared.borrow_mut().provider = None;
    }
}
