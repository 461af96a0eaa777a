//! codec/null.rs
//! Identity stage: the reference implementation of the codec contract.

use crate::codec::types::{Codec, CodecError, FlushMode, Flushed, Transformed};
use crate::utils::copy_into;

#[derive(Debug, Default, Clone, Copy)]
pub struct NullCodec;

impl NullCodec {
    pub fn new() -> Self {
        NullCodec
    }

    pub fn boxed() -> Box<dyn Codec> {
        Box::new(NullCodec)
    }
}

impl Codec for NullCodec {
    fn name(&self) -> &'static str {
        "null"
    }

    fn transform(&mut self, src: &[u8], dst: &mut [u8]) -> Result<Transformed, CodecError> {
        let n = copy_into(dst, src);
        Ok(Transformed::new(n, n))
    }

    fn flush(&mut self, _dst: &mut [u8], _mode: FlushMode) -> Result<Flushed, CodecError> {
        Ok(Flushed::done(0))
    }

    fn is_stateful(&self) -> bool {
        false
    }
}
