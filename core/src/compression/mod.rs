//! compression/mod.rs
//! Deflate-family compression stage.
//!
//! Industry notes:
//! - gzip is what HTTP `Content-Encoding` negotiates; zlib and raw deflate are kept for
//!   embedded resources produced by other tools.
//! - One stage instance covers one logical stream end to end, never per chunk.

pub mod types;
pub mod gzip;
pub mod codec;

pub use types::*;
pub use codec::CompressionCodec;
