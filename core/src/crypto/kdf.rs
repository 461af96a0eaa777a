// ## src/crypto/kdf.rs

//! crypto/kdf.rs
//! HKDF-based derivation of cipher-stage key + IV from a resource secret.
//!
//! Design:
//! - HKDF-Extract(secret, salt) -> PRK
//! - HKDF-Expand(PRK, info) -> 48 bytes = AES-256 key || CBC IV
//!
//! Industry notes:
//! - Lets embedded resources be encrypted with a per-resource IV from one server secret.
//! - `info` should name the resource so two resources never share key+IV.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::crypto::types::{CipherMaterial, CryptoError, IV_LEN_16, KEY_LEN_32};

/// Derive an AES-256 key and a CBC IV.
///
/// Errors:
/// - an empty secret or an all-zero salt is refused.
pub fn derive_cipher_material(
    secret: &[u8],
    salt: &[u8],
    info: &[u8],
) -> Result<CipherMaterial, CryptoError> {
    if secret.is_empty() {
        return Err(CryptoError::Failure("secret must not be empty".into()));
    }
    if !salt.is_empty() && salt.iter().all(|&b| b == 0) {
        return Err(CryptoError::Failure("salt must not be all-zero".into()));
    }

    let hk = Hkdf::<Sha256>::new(Some(salt), secret);
    let mut okm = [0u8; KEY_LEN_32 + IV_LEN_16];
    hk.expand(info, &mut okm)
        .map_err(|_| CryptoError::Failure("HKDF expand failed (SHA-256)".into()))?;

    let mut key = [0u8; KEY_LEN_32];
    let mut iv = [0u8; IV_LEN_16];
    key.copy_from_slice(&okm[..KEY_LEN_32]);
    iv.copy_from_slice(&okm[KEY_LEN_32..]);
    Ok(CipherMaterial { key, iv })
}
