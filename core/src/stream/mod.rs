//! stream/mod.rs
//! Buffered stream over a transport with an attachable codec chain.

pub mod config;
pub mod core;
pub mod io;
pub(crate) mod inner;

pub use self::config::StreamConfig;
pub use self::core::Stream;
pub use self::io::{copy, pipe};
