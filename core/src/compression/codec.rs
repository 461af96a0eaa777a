//! compression/codec.rs
//! Streaming deflate-family stage (gzip, zlib, raw deflate) on top of flate2's
//! low-level `Compress`/`Decompress`, writing straight into the staging area.
//!
//! Notes:
//! - Gzip framing is done here: flate2 runs raw deflate, the header is emitted/parsed
//!   around it and the trailer carries a crc32fast checksum.
//! - `flush(Chunk)` on the compressor issues a sync flush only if input arrived since
//!   the previous one, so an idle chunk flush emits nothing.
//! - `flush(Chunk)` on the decompressor drains output the inflater is still holding.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use log::warn;

use crate::codec::{Codec, CodecError, FlushMode, Flushed, Transformed};
use crate::compression::gzip;
use crate::compression::types::{CompressionFormat, CompressionMode};
use crate::constants::{DEFAULT_LEVEL_DEFLATE, GZIP_TRAILER_LEN};
use crate::utils::{copy_into, Crc32};

enum Engine {
    Deflate(Compress),
    Inflate(Decompress),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Decoder only: collecting the gzip member header.
    Header,
    Body,
    /// Gzip trailer being emitted (encoder) or collected (decoder).
    Trailer,
    Done,
}

pub struct CompressionCodec {
    mode: CompressionMode,
    format: CompressionFormat,
    engine: Engine,
    state: State,
    crc: Crc32,
    /// Encoder: header/trailer bytes waiting for room. Decoder: header/trailer being collected.
    pending: Vec<u8>,
    pending_off: usize,
    /// Input arrived since the last sync flush.
    dirty: bool,
    finalized: bool,
}

impl CompressionCodec {
    pub fn new(
        mode: CompressionMode,
        format: CompressionFormat,
        level: u32,
    ) -> Result<Self, CodecError> {
        if level > 9 {
            return Err(CodecError::InvalidArgument(format!(
                "compression level {} out of range 0..=9",
                level
            )));
        }
        let zlib_header = format == CompressionFormat::Zlib;
        let engine = match mode {
            CompressionMode::Compress => {
                Engine::Deflate(Compress::new(Compression::new(level), zlib_header))
            }
            CompressionMode::Decompress => Engine::Inflate(Decompress::new(zlib_header)),
        };
        let (state, pending) = match (mode, format) {
            (CompressionMode::Compress, CompressionFormat::Gzip) => {
                (State::Body, gzip::encode_header(level).to_vec())
            }
            (CompressionMode::Decompress, CompressionFormat::Gzip) => (State::Header, Vec::new()),
            _ => (State::Body, Vec::new()),
        };
        Ok(Self {
            mode,
            format,
            engine,
            state,
            crc: Crc32::new(),
            pending,
            pending_off: 0,
            dirty: false,
            finalized: false,
        })
    }

    pub fn compressor(format: CompressionFormat) -> Result<Self, CodecError> {
        Self::new(CompressionMode::Compress, format, DEFAULT_LEVEL_DEFLATE)
    }

    pub fn decompressor(format: CompressionFormat) -> Result<Self, CodecError> {
        Self::new(CompressionMode::Decompress, format, DEFAULT_LEVEL_DEFLATE)
    }

    pub fn mode(&self) -> CompressionMode {
        self.mode
    }

    pub fn format(&self) -> CompressionFormat {
        self.format
    }

    fn drain_pending(&mut self, dst: &mut [u8]) -> usize {
        let n = copy_into(dst, &self.pending[self.pending_off..]);
        self.pending_off += n;
        if self.pending_off == self.pending.len() {
            self.pending.clear();
            self.pending_off = 0;
        }
        n
    }

    fn has_pending(&self) -> bool {
        self.pending_off < self.pending.len()
    }

    fn deflate_step(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
        flush: FlushCompress,
    ) -> Result<(usize, usize, Status), CodecError> {
        let Engine::Deflate(c) = &mut self.engine else {
            return Err(CodecError::InvalidState("deflate step on a decompressor".into()));
        };
        let (in0, out0) = (c.total_in(), c.total_out());
        let status = c
            .compress(src, dst, flush)
            .map_err(|e| CodecError::InvalidState(format!("{} compress failed: {}", self.format, e)))?;
        let consumed = (c.total_in() - in0) as usize;
        let produced = (c.total_out() - out0) as usize;
        Ok((consumed, produced, status))
    }

    fn inflate_step(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
    ) -> Result<(usize, usize, Status), CodecError> {
        let Engine::Inflate(d) = &mut self.engine else {
            return Err(CodecError::InvalidState("inflate step on a compressor".into()));
        };
        let (in0, out0) = (d.total_in(), d.total_out());
        let status = d
            .decompress(src, dst, FlushDecompress::None)
            .map_err(|e| CodecError::CorruptData(format!("{} stream: {}", self.format, e)))?;
        let consumed = (d.total_in() - in0) as usize;
        let produced = (d.total_out() - out0) as usize;
        if self.format == CompressionFormat::Gzip {
            self.crc.update(&dst[..produced]);
        }
        Ok((consumed, produced, status))
    }

    /// Deflate body ended: queue the gzip trailer or finish outright.
    fn end_of_body(&mut self) {
        match (self.mode, self.format) {
            (CompressionMode::Compress, CompressionFormat::Gzip) => {
                self.pending = gzip::encode_trailer(self.crc.sum(), self.crc.amount()).to_vec();
                self.pending_off = 0;
                self.state = State::Trailer;
            }
            (CompressionMode::Decompress, CompressionFormat::Gzip) => {
                self.pending.clear();
                self.state = State::Trailer;
            }
            _ => self.state = State::Done,
        }
    }

    // ---------------------------------------------------------------------
    // Compress side
    // ---------------------------------------------------------------------

    fn compress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<Transformed, CodecError> {
        let mut produced = self.drain_pending(dst);
        if self.has_pending() || src.is_empty() {
            return Ok(Transformed::new(0, produced));
        }
        if self.state != State::Body {
            return Err(CodecError::InvalidState(format!(
                "{} compressor already finished, {} bytes refused",
                self.format,
                src.len()
            )));
        }
        let (consumed, p, _) = self.deflate_step(src, &mut dst[produced..], FlushCompress::None)?;
        if self.format == CompressionFormat::Gzip {
            self.crc.update(&src[..consumed]);
        }
        self.dirty |= consumed > 0;
        produced += p;
        Ok(Transformed::new(consumed, produced))
    }

    fn compress_flush(&mut self, dst: &mut [u8], mode: FlushMode) -> Result<Flushed, CodecError> {
        let mut produced = self.drain_pending(dst);
        if self.has_pending() {
            return Ok(Flushed::more(produced));
        }
        match mode {
            FlushMode::Chunk => {
                if self.state != State::Body || !self.dirty {
                    return Ok(Flushed::done(produced));
                }
                let room = dst.len() - produced;
                let (_, p, _) = self.deflate_step(&[], &mut dst[produced..], FlushCompress::Sync)?;
                produced += p;
                if p == room {
                    return Ok(Flushed::more(produced));
                }
                self.dirty = false;
                Ok(Flushed::done(produced))
            }
            FlushMode::Complete => loop {
                match self.state {
                    State::Body => {
                        if produced == dst.len() {
                            return Ok(Flushed::more(produced));
                        }
                        let (_, p, status) =
                            self.deflate_step(&[], &mut dst[produced..], FlushCompress::Finish)?;
                        produced += p;
                        if status == Status::StreamEnd {
                            self.end_of_body();
                        } else if p == 0 {
                            return Err(CodecError::InvalidState(format!(
                                "{} compressor stalled while finishing",
                                self.format
                            )));
                        }
                    }
                    State::Trailer => {
                        produced += self.drain_pending(&mut dst[produced..]);
                        if self.has_pending() {
                            return Ok(Flushed::more(produced));
                        }
                        self.state = State::Done;
                    }
                    State::Header | State::Done => {
                        self.finalized = true;
                        return Ok(Flushed::done(produced));
                    }
                }
            },
        }
    }

    // ---------------------------------------------------------------------
    // Decompress side
    // ---------------------------------------------------------------------

    fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<Transformed, CodecError> {
        let mut consumed = 0;
        let mut produced = 0;
        loop {
            match self.state {
                State::Header => {
                    if consumed == src.len() {
                        break;
                    }
                    self.pending.push(src[consumed]);
                    consumed += 1;
                    if gzip::parse_header(&self.pending)?.is_some() {
                        self.pending.clear();
                        self.state = State::Body;
                    }
                }
                State::Body => {
                    if produced == dst.len() {
                        break;
                    }
                    let (c, p, status) = self.inflate_step(&src[consumed..], &mut dst[produced..])?;
                    consumed += c;
                    produced += p;
                    if status == Status::StreamEnd {
                        self.end_of_body();
                    } else if c == 0 && p == 0 {
                        break;
                    }
                }
                State::Trailer => {
                    if consumed == src.len() {
                        break;
                    }
                    let want = GZIP_TRAILER_LEN - self.pending.len();
                    let take = want.min(src.len() - consumed);
                    self.pending.extend_from_slice(&src[consumed..consumed + take]);
                    consumed += take;
                    if self.pending.len() == GZIP_TRAILER_LEN {
                        gzip::verify_trailer(&self.pending, self.crc.sum(), self.crc.amount())?;
                        self.pending.clear();
                        self.state = State::Done;
                    }
                }
                State::Done => {
                    if consumed < src.len() {
                        warn!("[{}] {} trailing bytes after end of stream", self.format, src.len() - consumed);
                        return Err(CodecError::CorruptData(format!(
                            "{} trailing bytes after end of {} stream",
                            src.len() - consumed,
                            self.format
                        )));
                    }
                    break;
                }
            }
        }
        Ok(Transformed::new(consumed, produced))
    }

    fn decompress_flush(&mut self, dst: &mut [u8], mode: FlushMode) -> Result<Flushed, CodecError> {
        let mut produced = 0;
        loop {
            match self.state {
                State::Body => {
                    if produced == dst.len() {
                        return Ok(Flushed::more(produced));
                    }
                    let (_, p, status) = self.inflate_step(&[], &mut dst[produced..])?;
                    produced += p;
                    if status == Status::StreamEnd {
                        self.end_of_body();
                        continue;
                    }
                    if p > 0 {
                        continue;
                    }
                    if mode == FlushMode::Chunk {
                        return Ok(Flushed::done(produced));
                    }
                    return Err(CodecError::CorruptData(format!(
                        "truncated {} stream",
                        self.format
                    )));
                }
                State::Header | State::Trailer => {
                    if mode == FlushMode::Chunk {
                        return Ok(Flushed::done(produced));
                    }
                    return Err(CodecError::CorruptData(format!(
                        "truncated {} {}",
                        self.format,
                        if self.state == State::Header { "header" } else { "trailer" }
                    )));
                }
                State::Done => {
                    if mode == FlushMode::Complete {
                        self.finalized = true;
                    }
                    return Ok(Flushed::done(produced));
                }
            }
        }
    }
}

impl Codec for CompressionCodec {
    fn name(&self) -> &'static str {
        self.format.name()
    }

    fn transform(&mut self, src: &[u8], dst: &mut [u8]) -> Result<Transformed, CodecError> {
        if self.finalized {
            if src.is_empty() {
                return Ok(Transformed::default());
            }
            return Err(CodecError::InvalidState(format!("{} stage already finalized", self.format)));
        }
        match self.mode {
            CompressionMode::Compress => self.compress(src, dst),
            CompressionMode::Decompress => self.decompress(src, dst),
        }
    }

    fn flush(&mut self, dst: &mut [u8], mode: FlushMode) -> Result<Flushed, CodecError> {
        if self.finalized {
            return match mode {
                FlushMode::Chunk => Ok(Flushed::done(0)),
                FlushMode::Complete => Err(CodecError::InvalidState(format!(
                    "{} stage already finalized",
                    self.format
                ))),
            };
        }
        match self.mode {
            CompressionMode::Compress => self.compress_flush(dst, mode),
            CompressionMode::Decompress => self.decompress_flush(dst, mode),
        }
    }
}
