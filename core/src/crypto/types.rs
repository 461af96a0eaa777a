// ## 📂 File: `src/crypto/types.rs`

use std::fmt;

/// Length of a derived cipher key (AES-256).
pub const KEY_LEN_32: usize = 32;

/// CBC initialization vector length (one AES block).
pub const IV_LEN_16: usize = 16;

/// Encrypt or decrypt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CipherDirection {
    Encrypt,
    Decrypt,
}

/// Block cipher + chaining mode, picked from the key length.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CipherKind {
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
}

impl CipherKind {
    pub fn from_key_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(CipherKind::Aes128Cbc),
            24 => Some(CipherKind::Aes192Cbc),
            32 => Some(CipherKind::Aes256Cbc),
            _ => None,
        }
    }

    pub fn key_len(&self) -> usize {
        match self {
            CipherKind::Aes128Cbc => 16,
            CipherKind::Aes192Cbc => 24,
            CipherKind::Aes256Cbc => 32,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CipherKind::Aes128Cbc => "aes-128-cbc",
            CipherKind::Aes192Cbc => "aes-192-cbc",
            CipherKind::Aes256Cbc => "aes-256-cbc",
        }
    }
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key material for the cipher stage.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherMaterial {
    pub key: [u8; KEY_LEN_32],
    pub iv: [u8; IV_LEN_16],
}

impl fmt::Debug for CipherMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never print key bytes
        f.debug_struct("CipherMaterial").finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// General derivation or runtime error with context.
    #[error("crypto failure: {0}")]
    Failure(String),
}
