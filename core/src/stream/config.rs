//! stream/config.rs
//! Buffer sizing and naming for a stream.

use serde::{Deserialize, Serialize};

use crate::constants::{
    CIPHER_BLOCK_LEN, DEFAULT_MAX_LINE, DEFAULT_RBUF_SIZE, DEFAULT_STAGING_SIZE, DEFAULT_WBUF_SIZE,
};
use crate::types::{StreamError, StreamResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Input buffer size; one transport read never asks for more.
    pub rbuf_size: usize,
    /// Output buffer size; reaching it triggers a transport write.
    pub wbuf_size: usize,
    /// Staging capacity of every codec attached to the stream.
    pub staging_size: usize,
    /// Longest line `getline` assembles.
    pub max_line: usize,
    /// Diagnostic name shown in logs.
    pub name: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            rbuf_size: DEFAULT_RBUF_SIZE,
            wbuf_size: DEFAULT_WBUF_SIZE,
            staging_size: DEFAULT_STAGING_SIZE,
            max_line: DEFAULT_MAX_LINE,
            name: None,
        }
    }
}

impl StreamConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parse a (possibly partial) JSON object; missing fields keep their defaults.
    pub fn from_json(s: &str) -> StreamResult<Self> {
        let cfg: StreamConfig = serde_json::from_str(s)
            .map_err(|e| StreamError::InvalidArgument(format!("stream config: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> StreamResult<()> {
        if self.rbuf_size == 0 || self.wbuf_size == 0 {
            return Err(StreamError::InvalidArgument("buffer sizes must be non-zero".into()));
        }
        if self.staging_size < CIPHER_BLOCK_LEN {
            return Err(StreamError::InvalidArgument(format!(
                "staging size {} is smaller than one cipher block ({})",
                self.staging_size, CIPHER_BLOCK_LEN
            )));
        }
        if self.max_line == 0 {
            return Err(StreamError::InvalidArgument("max_line must be non-zero".into()));
        }
        Ok(())
    }
}
