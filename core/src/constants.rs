//! constants.rs
//! Buffer sizes, thresholds and wire constants shared by streams and codecs.

/// Default size of a stream's input (read-ahead) buffer.
pub const DEFAULT_RBUF_SIZE: usize = 4096;

/// Default size of a stream's output buffer. Reaching it triggers a transport write.
pub const DEFAULT_WBUF_SIZE: usize = 4096;

/// Default capacity of a codec's staging buffer.
pub const DEFAULT_STAGING_SIZE: usize = 4096;

/// Longest line `getline` will assemble before returning a partial line.
pub const DEFAULT_MAX_LINE: usize = 64 * 1024;

/// Bytes the deferred-header filter holds back before it starts draining.
pub const DEFAULT_DEFERRED_THRESHOLD: usize = 4096;

/// Block size of the cipher stage (AES).
pub const CIPHER_BLOCK_LEN: usize = 16;

/// Accepted cipher key lengths: AES-128, AES-192, AES-256.
pub const CIPHER_KEY_LENGTHS: &[usize] = &[16, 24, 32];

/// Default compression level (balanced).
pub const DEFAULT_LEVEL_DEFLATE: u32 = 6;

/// Upper bound for a gzip member header (FEXTRA + FNAME + FCOMMENT).
pub const MAX_GZIP_HEADER_LEN: usize = 64 * 1024;

/// Gzip magic + method (deflate).
pub const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// Gzip trailer: CRC-32 + ISIZE, both little-endian.
pub const GZIP_TRAILER_LEN: usize = 8;

/// Gzip header flag bits.
pub mod gzip_flags {
    pub const FTEXT: u8    = 0x01;
    pub const FHCRC: u8    = 0x02;
    pub const FEXTRA: u8   = 0x04;
    pub const FNAME: u8    = 0x08;
    pub const FCOMMENT: u8 = 0x10;
    pub const RESERVED: u8 = 0xe0;
}
