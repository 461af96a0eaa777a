//! codec/mod.rs
//! Transform stages and the chain that sequences them.

pub mod types;
pub mod chain;
pub mod null;

pub use types::*;
pub use chain::{ChainDirection, CodecChain, Position};
pub use null::NullCodec;
