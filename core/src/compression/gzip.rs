//! compression/gzip.rs
//! Gzip member header and trailer (RFC 1952) around a raw deflate body.

use crate::codec::CodecError;
use crate::constants::{gzip_flags, GZIP_MAGIC, GZIP_TRAILER_LEN, MAX_GZIP_HEADER_LEN};
use crate::utils::compute_crc32;

/// Fixed part of every member header.
pub const GZIP_HEADER_LEN: usize = 10;

/// OS byte: unknown.
const OS_UNKNOWN: u8 = 0xff;

/// Minimal header: no name, no mtime.
pub fn encode_header(level: u32) -> [u8; GZIP_HEADER_LEN] {
    let xfl = match level {
        9 => 2, // max compression
        1 => 4, // fastest
        _ => 0,
    };
    [
        GZIP_MAGIC[0], GZIP_MAGIC[1], GZIP_MAGIC[2],
        0,          // FLG
        0, 0, 0, 0, // MTIME
        xfl,
        OS_UNKNOWN,
    ]
}

pub fn encode_trailer(crc: u32, isize: u32) -> [u8; GZIP_TRAILER_LEN] {
    let mut out = [0u8; GZIP_TRAILER_LEN];
    out[..4].copy_from_slice(&crc.to_le_bytes());
    out[4..].copy_from_slice(&isize.to_le_bytes());
    out
}

/// Length of the complete header at the start of `buf`, `None` when more bytes are needed.
pub fn parse_header(buf: &[u8]) -> Result<Option<usize>, CodecError> {
    if buf.len() > MAX_GZIP_HEADER_LEN {
        return Err(CodecError::CorruptData(format!(
            "gzip header exceeds {} bytes",
            MAX_GZIP_HEADER_LEN
        )));
    }
    // Check magic as soon as the bytes exist so garbage fails fast.
    for (i, (&have, &want)) in buf.iter().zip(GZIP_MAGIC.iter()).enumerate() {
        if have != want {
            return Err(CodecError::CorruptData(format!(
                "bad gzip magic at byte {}: 0x{:02x}",
                i, have
            )));
        }
    }
    if buf.len() < GZIP_HEADER_LEN {
        return Ok(None);
    }

    let flg = buf[3];
    if flg & gzip_flags::RESERVED != 0 {
        return Err(CodecError::CorruptData(format!("reserved gzip flags set: 0x{:02x}", flg)));
    }

    let mut pos = GZIP_HEADER_LEN;
    if flg & gzip_flags::FEXTRA != 0 {
        if buf.len() < pos + 2 {
            return Ok(None);
        }
        let xlen = u16::from_le_bytes([buf[pos], buf[pos + 1]]) as usize;
        pos += 2 + xlen;
        if buf.len() < pos {
            return Ok(None);
        }
    }
    for field in [gzip_flags::FNAME, gzip_flags::FCOMMENT] {
        if flg & field != 0 {
            match buf[pos..].iter().position(|&b| b == 0) {
                Some(z) => pos += z + 1,
                None => return Ok(None),
            }
        }
    }
    if flg & gzip_flags::FHCRC != 0 {
        if buf.len() < pos + 2 {
            return Ok(None);
        }
        let stored = u16::from_le_bytes([buf[pos], buf[pos + 1]]);
        let actual = (compute_crc32(&buf[..pos]) & 0xffff) as u16;
        if stored != actual {
            return Err(CodecError::CorruptData(format!(
                "gzip header crc mismatch: stored=0x{:04x} actual=0x{:04x}",
                stored, actual
            )));
        }
        pos += 2;
    }
    Ok(Some(pos))
}

/// Verify a complete 8-byte trailer against the running checksum and size.
pub fn verify_trailer(trailer: &[u8], crc: u32, isize: u32) -> Result<(), CodecError> {
    if trailer.len() != GZIP_TRAILER_LEN {
        return Err(CodecError::CorruptData("truncated gzip trailer".into()));
    }
    let stored_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let stored_len = u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]);
    if stored_crc != crc {
        return Err(CodecError::CorruptData(format!(
            "gzip crc mismatch: stored=0x{:08x} actual=0x{:08x}",
            stored_crc, crc
        )));
    }
    if stored_len != isize {
        return Err(CodecError::CorruptData(format!(
            "gzip size mismatch: stored={} actual={}",
            stored_len, isize
        )));
    }
    Ok(())
}
