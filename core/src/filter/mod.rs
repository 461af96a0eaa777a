//! filter/mod.rs
//! Output filters the HTTP response layer attaches to outgoing streams.

pub mod deferred;

pub use deferred::{DeferredHeaderFilter, FilterHandle, FilterState};
