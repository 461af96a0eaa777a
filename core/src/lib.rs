//! kio-core
//!
//! Layered, blocking stream I/O: one byte-stream interface over descriptor, memory
//! and secure-channel transports, with an attachable chain of transform stages
//! (compression, block cipher, deferred-header output filter).

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;

// Stages
pub mod codec;
pub mod compression;
pub mod crypto;
pub mod filter;

// Transports and the stream on top of them
pub mod transport;
pub mod stream;
pub mod telemetry;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::codec::{Codec, CodecError, FlushMode, NullCodec, Position};
    pub use crate::compression::{CompressionCodec, CompressionFormat, CompressionMode};
    pub use crate::crypto::{derive_cipher_material, CipherCodec, CipherDirection, CipherMaterial};
    pub use crate::filter::{DeferredHeaderFilter, FilterHandle};
    pub use crate::stream::{copy, pipe, Stream, StreamConfig};
    pub use crate::telemetry::StreamCounters;
    pub use crate::transport::{
        Backend, Descriptor, FdTransport, IoFlags, MemTransport, SecureChannel, SecureTransport,
        Transport, TransportKind,
    };
    pub use crate::types::{Op, StreamError, StreamResult};
}
