//! src/crypto/cipher.rs
//! AES-CBC stage with PKCS#7 padding.
//!
//! Design notes:
//! - Key length selects AES-128/192/256; the IV is one block.
//! - Partial blocks are held until complete. The decryptor also holds back the last
//!   full block until it knows more ciphertext follows, because that block carries
//!   the padding.
//! - Only `flush(Complete)` pads (encrypt) or validates/strips padding (decrypt).
//!   A second complete flush is an `InvalidState`, never a second padding block.

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256, Block};

use crate::codec::{Codec, CodecError, FlushMode, Flushed, Transformed};
use crate::constants::{CIPHER_BLOCK_LEN, CIPHER_KEY_LENGTHS};
use crate::crypto::types::{CipherDirection, CipherKind, CipherMaterial};

const BLOCK: usize = CIPHER_BLOCK_LEN;

enum BlockImpl {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl BlockImpl {
    fn new(kind: CipherKind, key: &[u8]) -> Result<Self, CodecError> {
        let bad_key = |_| CodecError::InvalidArgument(format!("bad key for {}", kind));
        Ok(match kind {
            CipherKind::Aes128Cbc => BlockImpl::Aes128(Aes128::new_from_slice(key).map_err(bad_key)?),
            CipherKind::Aes192Cbc => BlockImpl::Aes192(Aes192::new_from_slice(key).map_err(bad_key)?),
            CipherKind::Aes256Cbc => BlockImpl::Aes256(Aes256::new_from_slice(key).map_err(bad_key)?),
        })
    }

    fn encrypt(&self, block: &mut Block) {
        match self {
            BlockImpl::Aes128(c) => c.encrypt_block(block),
            BlockImpl::Aes192(c) => c.encrypt_block(block),
            BlockImpl::Aes256(c) => c.encrypt_block(block),
        }
    }

    fn decrypt(&self, block: &mut Block) {
        match self {
            BlockImpl::Aes128(c) => c.decrypt_block(block),
            BlockImpl::Aes192(c) => c.decrypt_block(block),
            BlockImpl::Aes256(c) => c.decrypt_block(block),
        }
    }
}

pub struct CipherCodec {
    kind: CipherKind,
    direction: CipherDirection,
    cipher: BlockImpl,
    /// Previous ciphertext block (the IV before the first block).
    chain: [u8; BLOCK],
    partial: [u8; BLOCK],
    partial_len: usize,
    finalized: bool,
}

impl CipherCodec {
    pub fn new(direction: CipherDirection, key: &[u8], iv: &[u8]) -> Result<Self, CodecError> {
        let kind = CipherKind::from_key_len(key.len()).ok_or_else(|| {
            CodecError::InvalidArgument(format!(
                "invalid key length: expected one of {:?}, actual={}",
                CIPHER_KEY_LENGTHS,
                key.len()
            ))
        })?;
        if iv.len() != BLOCK {
            return Err(CodecError::InvalidArgument(format!(
                "invalid iv length: expected={}, actual={}",
                BLOCK,
                iv.len()
            )));
        }
        let mut chain = [0u8; BLOCK];
        chain.copy_from_slice(iv);
        Ok(Self {
            kind,
            direction,
            cipher: BlockImpl::new(kind, key)?,
            chain,
            partial: [0u8; BLOCK],
            partial_len: 0,
            finalized: false,
        })
    }

    pub fn encryptor(key: &[u8], iv: &[u8]) -> Result<Self, CodecError> {
        Self::new(CipherDirection::Encrypt, key, iv)
    }

    pub fn decryptor(key: &[u8], iv: &[u8]) -> Result<Self, CodecError> {
        Self::new(CipherDirection::Decrypt, key, iv)
    }

    pub fn from_material(direction: CipherDirection, m: &CipherMaterial) -> Result<Self, CodecError> {
        Self::new(direction, &m.key, &m.iv)
    }

    pub fn kind(&self) -> CipherKind {
        self.kind
    }

    pub fn direction(&self) -> CipherDirection {
        self.direction
    }

    /// CBC-encrypt `partial` into `out` (exactly one block).
    fn encrypt_partial(&mut self, out: &mut [u8]) {
        let mut block = Block::clone_from_slice(&self.partial);
        for (b, c) in block.iter_mut().zip(self.chain.iter()) {
            *b ^= c;
        }
        self.cipher.encrypt(&mut block);
        self.chain.copy_from_slice(&block);
        out.copy_from_slice(&block);
        self.partial_len = 0;
    }

    /// CBC-decrypt `partial`, returning the plaintext block.
    fn decrypt_partial(&mut self) -> [u8; BLOCK] {
        let mut block = Block::clone_from_slice(&self.partial);
        self.cipher.decrypt(&mut block);
        let mut plain = [0u8; BLOCK];
        for (i, p) in plain.iter_mut().enumerate() {
            *p = block[i] ^ self.chain[i];
        }
        self.chain.copy_from_slice(&self.partial);
        self.partial_len = 0;
        plain
    }

    fn fill_partial(&mut self, src: &[u8]) -> usize {
        let take = (BLOCK - self.partial_len).min(src.len());
        self.partial[self.partial_len..self.partial_len + take].copy_from_slice(&src[..take]);
        self.partial_len += take;
        take
    }

    fn encrypt(&mut self, src: &[u8], dst: &mut [u8]) -> Transformed {
        let (mut consumed, mut produced) = (0, 0);
        loop {
            if self.partial_len == BLOCK {
                if dst.len() - produced < BLOCK {
                    break;
                }
                self.encrypt_partial(&mut dst[produced..produced + BLOCK]);
                produced += BLOCK;
            }
            if consumed == src.len() {
                break;
            }
            consumed += self.fill_partial(&src[consumed..]);
        }
        Transformed::new(consumed, produced)
    }

    fn decrypt(&mut self, src: &[u8], dst: &mut [u8]) -> Transformed {
        let (mut consumed, mut produced) = (0, 0);
        loop {
            // a full block is only known not to be the last one once more input shows up
            if self.partial_len == BLOCK && consumed < src.len() {
                if dst.len() - produced < BLOCK {
                    break;
                }
                let plain = self.decrypt_partial();
                dst[produced..produced + BLOCK].copy_from_slice(&plain);
                produced += BLOCK;
            }
            if consumed == src.len() {
                break;
            }
            consumed += self.fill_partial(&src[consumed..]);
        }
        Transformed::new(consumed, produced)
    }

    fn finish_encrypt(&mut self, dst: &mut [u8]) -> Flushed {
        let mut produced = 0;
        if self.partial_len == BLOCK {
            if dst.len() < BLOCK {
                return Flushed::more(0);
            }
            self.encrypt_partial(&mut dst[..BLOCK]);
            produced += BLOCK;
        }
        if dst.len() - produced < BLOCK {
            return Flushed::more(produced);
        }
        let pad = (BLOCK - self.partial_len) as u8;
        for b in &mut self.partial[self.partial_len..] {
            *b = pad;
        }
        self.partial_len = BLOCK;
        self.encrypt_partial(&mut dst[produced..produced + BLOCK]);
        produced += BLOCK;
        self.finalized = true;
        Flushed::done(produced)
    }

    fn finish_decrypt(&mut self, dst: &mut [u8]) -> Result<Flushed, CodecError> {
        if self.partial_len != BLOCK {
            return Err(CodecError::CorruptData(format!(
                "ciphertext is not a whole number of {}-byte blocks ({} trailing)",
                BLOCK, self.partial_len
            )));
        }
        if dst.len() < BLOCK {
            return Ok(Flushed::more(0));
        }
        let plain = self.decrypt_partial();
        let pad = plain[BLOCK - 1] as usize;
        if pad == 0 || pad > BLOCK {
            return Err(CodecError::CorruptData(format!("invalid padding length {}", pad)));
        }
        if plain[BLOCK - pad..].iter().any(|&b| b as usize != pad) {
            return Err(CodecError::CorruptData("inconsistent padding bytes".into()));
        }
        let keep = BLOCK - pad;
        dst[..keep].copy_from_slice(&plain[..keep]);
        self.finalized = true;
        Ok(Flushed::done(keep))
    }
}

impl Codec for CipherCodec {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn transform(&mut self, src: &[u8], dst: &mut [u8]) -> Result<Transformed, CodecError> {
        if self.finalized {
            if src.is_empty() {
                return Ok(Transformed::default());
            }
            return Err(CodecError::InvalidState(format!("{} stage already finalized", self.kind)));
        }
        Ok(match self.direction {
            CipherDirection::Encrypt => self.encrypt(src, dst),
            CipherDirection::Decrypt => self.decrypt(src, dst),
        })
    }

    fn flush(&mut self, dst: &mut [u8], mode: FlushMode) -> Result<Flushed, CodecError> {
        if self.finalized {
            return match mode {
                FlushMode::Chunk => Ok(Flushed::done(0)),
                FlushMode::Complete => Err(CodecError::InvalidState(format!(
                    "{} stage already finalized",
                    self.kind
                ))),
            };
        }
        match (mode, self.direction) {
            // never pad early; only already-complete blocks may leave
            (FlushMode::Chunk, CipherDirection::Encrypt) => {
                if self.partial_len == BLOCK && dst.len() >= BLOCK {
                    self.encrypt_partial(&mut dst[..BLOCK]);
                    return Ok(Flushed::done(BLOCK));
                }
                Ok(Flushed::done(0))
            }
            (FlushMode::Chunk, CipherDirection::Decrypt) => Ok(Flushed::done(0)),
            (FlushMode::Complete, CipherDirection::Encrypt) => Ok(self.finish_encrypt(dst)),
            (FlushMode::Complete, CipherDirection::Decrypt) => self.finish_decrypt(dst),
        }
    }

    fn release(&mut self) {
        self.partial = [0u8; BLOCK];
        self.chain = [0u8; BLOCK];
        self.partial_len = 0;
    }
}
