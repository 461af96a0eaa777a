use crc32fast::Hasher;

/// Running CRC-32 (IEEE), the checksum carried in gzip trailers.
#[derive(Default, Clone)]
pub struct Crc32 {
    hasher: Hasher,
    amount: u32,
}

impl Crc32 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        // ISIZE is the input length modulo 2^32
        self.amount = self.amount.wrapping_add(data.len() as u32);
    }

    pub fn sum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }
}

pub fn compute_crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Position of `delim` in `haystack`, if any.
#[inline]
pub fn find_byte(haystack: &[u8], delim: u8) -> Option<usize> {
    haystack.iter().position(|&b| b == delim)
}

/// Copy as much of `src` as fits in `dst`, returning the count.
#[inline]
pub fn copy_into(dst: &mut [u8], src: &[u8]) -> usize {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
    n
}
