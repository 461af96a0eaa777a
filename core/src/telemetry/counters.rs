//! telemetry/counters.rs
//! Byte and call counts collected by a stream.
//!
//! Summary: the transport side (reads, writes, closes, bytes moved) and the caller
//! side (bytes delivered, bytes accepted) are counted separately, so the ratio
//! between them reflects what the codec chain did.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCounters {
    pub transport_reads: u64,
    pub transport_writes: u64,
    pub bytes_from_transport: u64,
    pub bytes_to_transport: u64,
    /// Bytes handed to the caller by read/getline/getc.
    pub bytes_delivered: u64,
    /// Bytes taken from the caller by write/putc.
    pub bytes_accepted: u64,
    pub transport_closes: u64,
    pub chain_flushes: u64,
}

impl StreamCounters {
    pub fn add_transport_read(&mut self, n: usize) {
        self.transport_reads += 1;
        self.bytes_from_transport += n as u64;
    }

    pub fn add_transport_write(&mut self, n: usize) {
        self.transport_writes += 1;
        self.bytes_to_transport += n as u64;
    }

    pub fn add_delivered(&mut self, n: usize) {
        self.bytes_delivered += n as u64;
    }

    pub fn add_accepted(&mut self, n: usize) {
        self.bytes_accepted += n as u64;
    }

    pub fn add_close(&mut self) {
        self.transport_closes += 1;
    }

    pub fn add_chain_flush(&mut self) {
        self.chain_flushes += 1;
    }

    /// Transport-side bytes over caller-side bytes, whichever direction carried traffic.
    /// Below 1.0 on a compressing write stream; 0.0 when nothing moved.
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_accepted > 0 {
            self.bytes_to_transport as f64 / self.bytes_accepted as f64
        } else if self.bytes_delivered > 0 {
            self.bytes_from_transport as f64 / self.bytes_delivered as f64
        } else {
            0.0
        }
    }

    pub fn merge(&mut self, other: &StreamCounters) {
        *self += *other;
    }

    pub fn to_json(&self) -> String {
        // plain integer fields cannot fail to serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl AddAssign for StreamCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.transport_reads      += rhs.transport_reads;
        self.transport_writes     += rhs.transport_writes;
        self.bytes_from_transport += rhs.bytes_from_transport;
        self.bytes_to_transport   += rhs.bytes_to_transport;
        self.bytes_delivered      += rhs.bytes_delivered;
        self.bytes_accepted       += rhs.bytes_accepted;
        self.transport_closes     += rhs.transport_closes;
        self.chain_flushes        += rhs.chain_flushes;
    }
}
