#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::{Read, Write};
    use std::rc::Rc;

    use bytes::BytesMut;
    use flate2::read::GzDecoder;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use proptest::prelude::*;

    use kio_core::codec::{ChainDirection, Codec, CodecChain, FlushMode, Position};
    use kio_core::compression::{CompressionCodec, CompressionFormat, CompressionMode};
    use kio_core::stream::Stream;
    use kio_core::types::StreamError;

    const FORMATS: [CompressionFormat; 3] =
        [CompressionFormat::Gzip, CompressionFormat::Zlib, CompressionFormat::Deflate];

    fn sample(len: usize) -> Vec<u8> {
        // compressible but not trivially so
        (0..len).map(|i| ((i * 7) % 251) as u8 ^ (i / 97) as u8).collect()
    }

    fn compress_via_stream(data: &[u8], format: CompressionFormat) -> Vec<u8> {
        let buf = Rc::new(RefCell::new(Vec::new()));
        let mut s = Stream::shared_memory(Rc::clone(&buf)).unwrap();
        let c = CompressionCodec::compressor(format).unwrap();
        s.codec_attach(Box::new(c), Position::Tail).unwrap();
        s.write(data).unwrap();
        s.finish().unwrap();
        s.close().unwrap();
        let out = buf.borrow().clone();
        out
    }

    fn decompress_via_stream(data: Vec<u8>, format: CompressionFormat) -> Result<Vec<u8>, StreamError> {
        let mut s = Stream::memory(data)?;
        let d = CompressionCodec::decompressor(format)?;
        s.codec_attach(Box::new(d), Position::Head)?;
        let mut out = Vec::new();
        let mut chunk = [0u8; 1000];
        loop {
            let n = s.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }
        Ok(out)
    }

    #[test]
    fn round_trip_for_every_format_and_size() {
        // empty, one byte, one block, many blocks plus a partial one
        for format in FORMATS {
            for len in [0usize, 1, 16, 100_003] {
                let data = sample(len);
                let packed = compress_via_stream(&data, format);
                let unpacked = decompress_via_stream(packed, format).unwrap();
                assert_eq!(unpacked, data, "{} round trip of {} bytes", format, len);
            }
        }
    }

    #[test]
    fn gzip_output_is_readable_by_flate2() {
        let data = sample(50_000);
        let packed = compress_via_stream(&data, CompressionFormat::Gzip);
        assert_eq!(&packed[..3], &[0x1f, 0x8b, 0x08]);

        let mut out = Vec::new();
        GzDecoder::new(&packed[..]).read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn flate2_gzip_is_readable_by_the_stage() {
        let data = sample(30_000);
        let mut enc = GzEncoder::new(Vec::new(), Compression::best());
        enc.write_all(&data).unwrap();
        let packed = enc.finish().unwrap();

        assert_eq!(decompress_via_stream(packed, CompressionFormat::Gzip).unwrap(), data);
    }

    #[test]
    fn pushback_serves_the_rest_without_touching_the_transport() {
        let packed = compress_via_stream(b"0123456789", CompressionFormat::Gzip);
        let mut s = Stream::memory(packed).unwrap();
        let d = CompressionCodec::decompressor(CompressionFormat::Gzip).unwrap();
        s.codec_attach(Box::new(d), Position::Head).unwrap();

        let mut two = [0u8; 2];
        assert_eq!(s.read(&mut two).unwrap(), 2);
        assert_eq!(&two, b"01");
        let reads_after_first = s.counters().transport_reads;

        let mut eight = [0u8; 8];
        assert_eq!(s.read(&mut eight).unwrap(), 8);
        assert_eq!(&eight, b"23456789");
        assert_eq!(s.counters().transport_reads, reads_after_first);

        assert_eq!(s.read(&mut eight).unwrap(), 0);
        assert!(s.eof());
    }

    #[test]
    fn bad_gzip_crc_is_corrupt_data() {
        let mut packed = compress_via_stream(&sample(4000), CompressionFormat::Gzip);
        let crc_at = packed.len() - 8;
        packed[crc_at] ^= 0xff;
        let err = decompress_via_stream(packed, CompressionFormat::Gzip).unwrap_err();
        assert!(matches!(err, StreamError::CorruptData(_)), "got {:?}", err);
    }

    #[test]
    fn truncated_stream_is_corrupt_data() {
        let mut packed = compress_via_stream(&sample(4000), CompressionFormat::Gzip);
        packed.truncate(packed.len() / 2);
        let err = decompress_via_stream(packed, CompressionFormat::Gzip).unwrap_err();
        assert!(matches!(err, StreamError::CorruptData(_)));
    }

    #[test]
    fn trailing_garbage_is_corrupt_data() {
        let mut packed = compress_via_stream(b"payload", CompressionFormat::Zlib);
        packed.extend_from_slice(b"junk");
        let err = decompress_via_stream(packed, CompressionFormat::Zlib).unwrap_err();
        assert!(matches!(err, StreamError::CorruptData(_)));
    }

    #[test]
    fn not_gzip_at_all_fails_fast() {
        let err = decompress_via_stream(b"plain text".to_vec(), CompressionFormat::Gzip).unwrap_err();
        assert!(matches!(err, StreamError::CorruptData(_)));
    }

    #[test]
    fn level_out_of_range_is_rejected() {
        let err = CompressionCodec::new(CompressionMode::Compress, CompressionFormat::Gzip, 10);
        assert!(err.is_err());
    }

    #[test]
    fn second_complete_flush_is_invalid_state() {
        let mut c = CompressionCodec::compressor(CompressionFormat::Deflate).unwrap();
        let mut dst = [0u8; 64];
        c.flush(&mut dst, FlushMode::Complete).unwrap();
        assert!(c.flush(&mut dst, FlushMode::Chunk).is_ok());
        assert!(c.flush(&mut dst, FlushMode::Complete).is_err());
    }

    #[test]
    fn chunk_flush_makes_written_bytes_decodable_mid_stream() {
        let mut chain = CodecChain::new(64);
        let c = CompressionCodec::compressor(CompressionFormat::Zlib).unwrap();
        chain.attach(Box::new(c), Position::Tail).unwrap();
        let mut packed = BytesMut::new();
        chain.transform(ChainDirection::Write, b"first half|", &mut packed).unwrap();
        chain.flush(ChainDirection::Write, FlushMode::Chunk, &mut packed).unwrap();

        // everything written so far decodes without the end of stream
        let mut dchain = CodecChain::new(64);
        let d = CompressionCodec::decompressor(CompressionFormat::Zlib).unwrap();
        dchain.attach(Box::new(d), Position::Head).unwrap();
        let mut plain = BytesMut::new();
        dchain.transform(ChainDirection::Read, &packed, &mut plain).unwrap();
        assert_eq!(&plain[..], b"first half|");
    }

    proptest! {
        #[test]
        fn prop_round_trip_small_staging(data in proptest::collection::vec(any::<u8>(), 0..6000),
                                         fmt in 0usize..3) {
            let format = FORMATS[fmt];
            let mut enc = CodecChain::new(32);
            enc.attach(Box::new(CompressionCodec::compressor(format).unwrap()), Position::Tail).unwrap();
            let mut packed = BytesMut::new();
            for piece in data.chunks(777) {
                enc.transform(ChainDirection::Write, piece, &mut packed).unwrap();
            }
            enc.flush(ChainDirection::Write, FlushMode::Complete, &mut packed).unwrap();

            let mut dec = CodecChain::new(32);
            dec.attach(Box::new(CompressionCodec::decompressor(format).unwrap()), Position::Head).unwrap();
            let mut plain = BytesMut::new();
            for piece in packed.chunks(100) {
                dec.transform(ChainDirection::Read, piece, &mut plain).unwrap();
            }
            dec.flush(ChainDirection::Read, FlushMode::Complete, &mut plain).unwrap();
            prop_assert_eq!(&plain[..], &data[..]);
        }
    }
}
