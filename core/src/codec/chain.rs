//! codec/chain.rs
//! Ordered transform chain owned by a stream.
//!
//! Design notes:
//! - `stages[0]` is the head (nearest the transport), the last element the tail
//!   (nearest the caller).
//! - Reads flow head -> tail, writes flow tail -> head.
//! - Every stage has its own bounded staging area. Output is pushed downstream as soon
//!   as it is produced, so a stage is never asked to transform with undrained output.

use bytes::BytesMut;
use log::{debug, trace};

use crate::codec::types::{Codec, CodecError, FlushMode, FlushStatus, Flushed, Transformed};

/// Where `attach` inserts a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Nearest the transport.
    Head,
    /// Nearest the caller.
    Tail,
}

/// Which side of the stream the chain serves. Locked on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainDirection {
    Read,
    Write,
}

/// Bounded output area of one stage, with fill (`count`) and offset (`off`) cursors.
#[derive(Debug)]
pub(crate) struct Staging {
    buf: Vec<u8>,
    off: usize,
    count: usize,
}

impl Staging {
    fn new(capacity: usize) -> Self {
        Self { buf: vec![0u8; capacity], off: 0, count: 0 }
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn is_empty(&self) -> bool {
        self.off == self.count
    }

    fn is_full(&self) -> bool {
        self.count == self.buf.len()
    }

    fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.count..]
    }

    fn commit(&mut self, n: usize) {
        self.count += n;
    }

    fn reset(&mut self) {
        self.off = 0;
        self.count = 0;
    }
}

/// A codec plus the staging area the chain manages for it.
pub(crate) struct Stage {
    codec: Box<dyn Codec>,
    staging: Staging,
}

impl Stage {
    fn new(codec: Box<dyn Codec>, staging_size: usize) -> Self {
        Self { codec, staging: Staging::new(staging_size) }
    }

    fn transform(&mut self, src: &[u8]) -> Result<Transformed, CodecError> {
        if !self.staging.is_empty() {
            return Err(CodecError::InvalidState(format!(
                "codec '{}' called again before its output was drained",
                self.codec.name()
            )));
        }
        self.staging.reset();
        let spare = self.staging.spare_mut();
        let room = spare.len();
        let t = self.codec.transform(src, spare)?;
        if t.consumed > src.len() || t.produced > room {
            return Err(CodecError::InvalidState(format!(
                "codec '{}' reported {} consumed / {} produced for {} in / {} room",
                self.codec.name(), t.consumed, t.produced, src.len(), room
            )));
        }
        self.staging.commit(t.produced);
        Ok(t)
    }

    fn flush(&mut self, mode: FlushMode) -> Result<Flushed, CodecError> {
        if !self.staging.is_empty() {
            return Err(CodecError::InvalidState(format!(
                "codec '{}' flushed before its output was drained",
                self.codec.name()
            )));
        }
        self.staging.reset();
        let spare = self.staging.spare_mut();
        let room = spare.len();
        let f = self.codec.flush(spare, mode)?;
        if f.produced > room {
            return Err(CodecError::InvalidState(format!(
                "codec '{}' flushed {} bytes into {} of room",
                self.codec.name(), f.produced, room
            )));
        }
        self.staging.commit(f.produced);
        Ok(f)
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        self.codec.release();
    }
}

/// Ordered, exclusively-owned sequence of stages.
pub struct CodecChain {
    stages: Vec<Stage>,
    staging_size: usize,
    direction: Option<ChainDirection>,
    finalized: bool,
}

impl CodecChain {
    pub fn new(staging_size: usize) -> Self {
        Self {
            stages: Vec::new(),
            staging_size,
            direction: None,
            finalized: false,
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn direction(&self) -> Option<ChainDirection> {
        self.direction
    }

    /// True when at least one stage keeps state across calls.
    pub fn is_stateful(&self) -> bool {
        self.stages.iter().any(|s| s.codec.is_stateful())
    }

    /// Stage names, head first.
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.codec.name()).collect()
    }

    pub fn staging_size(&self) -> usize {
        self.staging_size
    }

    pub fn attach(&mut self, codec: Box<dyn Codec>, pos: Position) -> Result<(), CodecError> {
        if self.finalized {
            return Err(CodecError::InvalidState(
                "cannot attach a codec to a finalized chain".into(),
            ));
        }
        debug!("[CHAIN] attach '{}' at {:?} (len={})", codec.name(), pos, self.stages.len());
        let stage = Stage::new(codec, self.staging_size);
        match pos {
            Position::Head => self.stages.insert(0, stage),
            Position::Tail => self.stages.push(stage),
        }
        Ok(())
    }

    /// Drop every stage (releasing each) and return to a pristine, empty chain.
    pub fn clear(&mut self) {
        if !self.stages.is_empty() {
            debug!("[CHAIN] releasing {} stage(s): {:?}", self.stages.len(), self.names());
        }
        self.stages.clear();
        self.direction = None;
        self.finalized = false;
    }

    /// Fix the direction on first use; reject later use from the other side.
    pub fn lock(&mut self, dir: ChainDirection) -> Result<(), CodecError> {
        match self.direction {
            None => {
                self.direction = Some(dir);
                Ok(())
            }
            Some(d) if d == dir => Ok(()),
            Some(d) => Err(CodecError::InvalidState(format!(
                "chain is bound to the {:?} side, cannot serve {:?}",
                d, dir
            ))),
        }
    }

    /// Push `input` through every stage in flow order, appending the result to `out`.
    /// All of `input` is consumed on success.
    pub fn transform(
        &mut self,
        dir: ChainDirection,
        input: &[u8],
        out: &mut BytesMut,
    ) -> Result<(), CodecError> {
        self.lock(dir)?;
        if self.finalized {
            if input.is_empty() {
                return Ok(());
            }
            return Err(CodecError::InvalidState(
                "chain already finalized, no more input accepted".into(),
            ));
        }
        self.feed(dir, 0, input, out)
    }

    /// Flush every stage in flow order; each stage's trailing output is transformed by
    /// the stages after it before those are flushed themselves.
    pub fn flush(
        &mut self,
        dir: ChainDirection,
        mode: FlushMode,
        out: &mut BytesMut,
    ) -> Result<(), CodecError> {
        self.lock(dir)?;
        if self.finalized {
            return match mode {
                FlushMode::Chunk => Ok(()),
                FlushMode::Complete => Err(CodecError::InvalidState(
                    "chain already finalized".into(),
                )),
            };
        }
        trace!("[CHAIN] flush({}) over {:?}", mode, self.names());
        for k in 0..self.stages.len() {
            let idx = self.flow_index(dir, k);
            loop {
                let f = self.stages[idx].flush(mode)?;
                self.drain_stage(dir, k, idx, out)?;
                if f.status == FlushStatus::Done {
                    break;
                }
                if f.produced == 0 {
                    return Err(CodecError::InvalidState(format!(
                        "codec '{}' asked for another flush without producing output",
                        self.stages[idx].codec.name()
                    )));
                }
            }
        }
        if mode == FlushMode::Complete {
            self.finalized = true;
        }
        Ok(())
    }

    fn flow_index(&self, dir: ChainDirection, k: usize) -> usize {
        match dir {
            ChainDirection::Read => k,
            ChainDirection::Write => self.stages.len() - 1 - k,
        }
    }

    fn feed(
        &mut self,
        dir: ChainDirection,
        k: usize,
        mut input: &[u8],
        out: &mut BytesMut,
    ) -> Result<(), CodecError> {
        if k == self.stages.len() {
            out.extend_from_slice(input);
            return Ok(());
        }
        let idx = self.flow_index(dir, k);
        loop {
            let t = self.stages[idx].transform(input)?;
            input = &input[t.consumed..];
            let filled = self.stages[idx].staging.is_full();
            if t.consumed == 0 && t.produced == 0 && !input.is_empty() {
                return Err(CodecError::InvalidState(format!(
                    "codec '{}' made no progress on {} pending bytes",
                    self.stages[idx].codec.name(),
                    input.len()
                )));
            }
            self.drain_stage(dir, k, idx, out)?;
            // a full staging area may mean the stage still holds output
            if input.is_empty() && !filled {
                return Ok(());
            }
        }
    }

    fn drain_stage(
        &mut self,
        dir: ChainDirection,
        k: usize,
        idx: usize,
        out: &mut BytesMut,
    ) -> Result<(), CodecError> {
        let staging = &mut self.stages[idx].staging;
        if staging.is_empty() {
            staging.reset();
            return Ok(());
        }
        let (off, count) = (staging.off, staging.count);
        let buf = std::mem::take(&mut staging.buf);
        let res = self.feed(dir, k + 1, &buf[off..count], out);
        let staging = &mut self.stages[idx].staging;
        staging.buf = buf;
        staging.reset();
        res
    }
}

impl std::fmt::Debug for CodecChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecChain")
            .field("stages", &self.names())
            .field("staging_size", &self.staging_size)
            .field("direction", &self.direction)
            .field("finalized", &self.finalized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::NullCodec;

    #[test]
    fn staging_capacity_matches_chain_setting() {
        let s = Staging::new(32);
        assert_eq!(s.capacity(), 32);
        assert!(s.is_empty());
    }

    #[test]
    fn direction_is_locked_by_first_use() {
        let mut chain = CodecChain::new(8);
        chain.attach(NullCodec::boxed(), Position::Tail).unwrap();
        let mut out = BytesMut::new();
        chain.transform(ChainDirection::Write, b"abc", &mut out).unwrap();
        assert!(chain.transform(ChainDirection::Read, b"x", &mut out).is_err());
    }

    #[test]
    fn input_larger_than_staging_passes_through() {
        let mut chain = CodecChain::new(8);
        chain.attach(NullCodec::boxed(), Position::Tail).unwrap();
        chain.attach(NullCodec::boxed(), Position::Head).unwrap();
        let data: Vec<u8> = (0..100u8).collect();
        let mut out = BytesMut::new();
        chain.transform(ChainDirection::Read, &data, &mut out).unwrap();
        assert_eq!(&out[..], &data[..]);
    }
}
