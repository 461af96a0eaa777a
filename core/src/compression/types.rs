//! compression/types.rs
//! Direction and container format for the compression stage.

use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompressionMode {
    Compress,
    Decompress,
}

/// Deflate-family container.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum CompressionFormat {
    /// RFC 1952, what `Content-Encoding: gzip` expects.
    #[default]
    Gzip,
    /// RFC 1950.
    Zlib,
    /// RFC 1951, no header or checksum.
    Deflate,
}

impl CompressionFormat {
    pub fn name(&self) -> &'static str {
        match self {
            CompressionFormat::Gzip    => "gzip",
            CompressionFormat::Zlib    => "zlib",
            CompressionFormat::Deflate => "deflate",
        }
    }
}

impl fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
