//! telemetry/mod.rs
//! Per-stream counters.
//!
//! Industry notes:
//! - Counters are plain integers owned by the stream; no atomics, the stream is
//!   single-threaded.
//! - Snapshots are copies, so callers can diff two of them or merge several.

pub mod counters;

pub use counters::*;
