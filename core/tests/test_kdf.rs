#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use proptest::prelude::*;

    use kio_core::codec::{ChainDirection, CodecChain, FlushMode, Position};
    use kio_core::crypto::{derive_cipher_material, CipherCodec, CipherDirection, CryptoError};

    #[test]
    fn same_inputs_same_material() {
        let a = derive_cipher_material(b"server secret", b"salt-0001", b"/index.html").unwrap();
        let b = derive_cipher_material(b"server secret", b"salt-0001", b"/index.html").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn resource_name_changes_key_and_iv() {
        let a = derive_cipher_material(b"server secret", b"salt-0001", b"/index.html").unwrap();
        let b = derive_cipher_material(b"server secret", b"salt-0001", b"/style.css").unwrap();
        assert_ne!(a.key, b.key);
        assert_ne!(a.iv, b.iv);
    }

    #[test]
    fn empty_secret_is_refused() {
        let err = derive_cipher_material(b"", b"salt", b"info").unwrap_err();
        assert!(matches!(err, CryptoError::Failure(_)));
    }

    #[test]
    fn all_zero_salt_is_refused() {
        assert!(derive_cipher_material(b"secret", &[0u8; 16], b"info").is_err());
        // no salt at all is fine, HKDF falls back to a zero-filled one internally
        assert!(derive_cipher_material(b"secret", b"", b"info").is_ok());
    }

    #[test]
    fn debug_never_prints_key_bytes() {
        let m = derive_cipher_material(b"secret", b"salt", b"info").unwrap();
        let shown = format!("{:?}", m);
        assert_eq!(shown, "CipherMaterial { .. }");
    }

    proptest! {
        #[test]
        fn prop_material_drives_a_working_cipher(secret in proptest::collection::vec(any::<u8>(), 1..64),
                                                 data in proptest::collection::vec(any::<u8>(), 0..300)) {
            let m = derive_cipher_material(&secret, b"resource-salt", b"asset").unwrap();

            let mut enc = CodecChain::new(64);
            enc.attach(Box::new(CipherCodec::from_material(CipherDirection::Encrypt, &m).unwrap()), Position::Tail).unwrap();
            let mut ct = BytesMut::new();
            enc.transform(ChainDirection::Write, &data, &mut ct).unwrap();
            enc.flush(ChainDirection::Write, FlushMode::Complete, &mut ct).unwrap();

            let mut dec = CodecChain::new(64);
            dec.attach(Box::new(CipherCodec::from_material(CipherDirection::Decrypt, &m).unwrap()), Position::Head).unwrap();
            let mut pt = BytesMut::new();
            dec.transform(ChainDirection::Read, &ct, &mut pt).unwrap();
            dec.flush(ChainDirection::Read, FlushMode::Complete, &mut pt).unwrap();
            prop_assert_eq!(&pt[..], &data[..]);
        }

        #[test]
        fn prop_distinct_salts_distinct_keys(s1 in any::<[u8; 16]>(), s2 in any::<[u8; 16]>()) {
            prop_assume!(s1 != s2);
            prop_assume!(s1.iter().any(|&b| b != 0) && s2.iter().any(|&b| b != 0));
            let a = derive_cipher_material(b"secret", &s1, b"info").unwrap();
            let b = derive_cipher_material(b"secret", &s2, b"info").unwrap();
            prop_assert_ne!(a.key, b.key);
        }
    }
}
