#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::io::{self, Read, Write};
    use std::rc::Rc;

    use kio_core::compression::{CompressionCodec, CompressionFormat};
    use kio_core::codec::Position;
    use kio_core::stream::Stream;
    use kio_core::transport::{SecureChannel, SecureTransport, Transport, TransportKind};
    use kio_core::types::{Op, StreamError};

    /// Session stand-in: application bytes in, application bytes out.
    struct MockSession {
        incoming: io::Cursor<Vec<u8>>,
        outgoing: Rc<RefCell<Vec<u8>>>,
        shutdowns: Rc<Cell<u32>>,
        read_error: Option<io::ErrorKind>,
    }

    impl MockSession {
        fn new(incoming: &[u8]) -> Self {
            Self {
                incoming: io::Cursor::new(incoming.to_vec()),
                outgoing: Rc::new(RefCell::new(Vec::new())),
                shutdowns: Rc::new(Cell::new(0)),
                read_error: None,
            }
        }
    }

    impl Read for MockSession {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if let Some(kind) = self.read_error {
                return Err(io::Error::new(kind, "session read failed"));
            }
            self.incoming.read(buf)
        }
    }

    impl Write for MockSession {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.outgoing.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SecureChannel for MockSession {
        fn shutdown(&mut self) -> io::Result<()> {
            self.shutdowns.set(self.shutdowns.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn secure_stream_reports_itself_secure_and_refuses_seek() {
        let mut s = Stream::secure(Box::new(MockSession::new(b""))).unwrap();
        assert!(s.is_secure());
        assert_eq!(s.kind(), TransportKind::Secure);
        assert!(matches!(s.seek(0), Err(StreamError::Unsupported(_))));
        assert!(matches!(s.tell(), Err(StreamError::Unsupported(_))));
        assert_eq!(s.size(), Some(0));
    }

    #[test]
    fn request_in_response_out() {
        let session = MockSession::new(b"GET /index.html HTTP/1.1\r\nHost: a\r\n\r\n");
        let outgoing = Rc::clone(&session.outgoing);
        let shutdowns = Rc::clone(&session.shutdowns);
        let mut s = Stream::secure(Box::new(session)).unwrap();

        let mut line = Vec::new();
        s.getline(&mut line).unwrap();
        assert_eq!(line, b"GET /index.html HTTP/1.1\r\n");

        s.write(b"HTTP/1.1 200 OK\r\n\r\n").unwrap();
        s.close().unwrap();
        assert_eq!(&*outgoing.borrow(), b"HTTP/1.1 200 OK\r\n\r\n");
        assert_eq!(shutdowns.get(), 1);

        drop(s);
        assert_eq!(shutdowns.get(), 1);
    }

    #[test]
    fn gzip_body_over_a_secure_channel() {
        let session = MockSession::new(b"");
        let outgoing = Rc::clone(&session.outgoing);
        let mut s = Stream::secure(Box::new(session)).unwrap();
        s.write(b"HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\n\r\n").unwrap();
        s.codec_attach(
            Box::new(CompressionCodec::compressor(CompressionFormat::Gzip).unwrap()),
            Position::Tail,
        )
        .unwrap();
        s.write(&[b'z'; 5000]).unwrap();
        s.close().unwrap();

        let wire = outgoing.borrow();
        let body_at = wire.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let mut body = Vec::new();
        flate2::read::GzDecoder::new(&wire[body_at..]).read_to_end(&mut body).unwrap();
        assert_eq!(body, vec![b'z'; 5000]);
    }

    #[test]
    fn channel_errors_carry_the_operation() {
        for kind in [io::ErrorKind::ConnectionReset, io::ErrorKind::UnexpectedEof] {
            let mut session = MockSession::new(b"");
            session.read_error = Some(kind);
            let mut t = SecureTransport::new(Box::new(session));
            let mut buf = [0u8; 4];
            let err = t.read(&mut buf).unwrap_err();
            match err {
                StreamError::Transport { op, source } => {
                    assert_eq!(op, Op::Read);
                    assert_eq!(source.kind(), kind);
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn released_channel_is_not_valid() {
        let mut t = SecureTransport::new(Box::new(MockSession::new(b"")));
        assert!(t.is_valid());
        t.free();
        assert!(!t.is_valid());
        assert!(Stream::create(t).is_err());
    }
}
