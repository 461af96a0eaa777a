#[cfg(test)]
mod tests {
    use std::fs::{File, OpenOptions};
    use std::io::{Read, Seek, SeekFrom, Write};
    use std::net::{TcpListener, TcpStream};

    use kio_core::compression::{CompressionCodec, CompressionFormat};
    use kio_core::codec::Position;
    use kio_core::stream::Stream;
    use kio_core::transport::{Descriptor, FdTransport, IoFlags, TransportKind};
    use kio_core::types::StreamError;

    fn read_all(s: &mut Stream) -> Vec<u8> {
        let mut out = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            let n = s.read(&mut chunk).unwrap();
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&chunk[..n]);
        }
    }

    #[test]
    fn file_write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");

        let mut w = Stream::from_fd(File::create(&path).unwrap(), IoFlags::FD_CLOSE).unwrap();
        assert_eq!(w.kind(), TransportKind::Descriptor);
        for i in 0..1000 {
            w.write(format!("line {}\n", i).as_bytes()).unwrap();
        }
        w.close().unwrap();

        let mut r = Stream::from_fd(File::open(&path).unwrap(), IoFlags::FD_CLOSE).unwrap();
        let mut line = Vec::new();
        r.getline(&mut line).unwrap();
        assert_eq!(line, b"line 0\n");
        let rest = read_all(&mut r);
        assert!(rest.ends_with(b"line 999\n"));
        assert_eq!(r.size(), Some(std::fs::metadata(&path).unwrap().len()));
    }

    #[test]
    fn file_seek_and_tell() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"0123456789abcdef").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();

        let mut s = Stream::from_fd(file, IoFlags::FD_CLOSE).unwrap();
        s.seek(10).unwrap();
        let mut b = [0u8; 3];
        s.read(&mut b).unwrap();
        assert_eq!(&b, b"abc");
        assert_eq!(s.tell().unwrap(), 13);
    }

    #[test]
    fn gzip_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset.gz");
        let body: Vec<u8> = b"<p>compressed asset</p>\n".iter().cycle().take(20_000).copied().collect();

        let mut w = Stream::from_fd(File::create(&path).unwrap(), IoFlags::FD_CLOSE).unwrap();
        let gz = CompressionCodec::compressor(CompressionFormat::Gzip).unwrap();
        w.codec_attach(Box::new(gz), Position::Tail).unwrap();
        w.write(&body).unwrap();
        w.close().unwrap();

        let mut r = Stream::from_fd(File::open(&path).unwrap(), IoFlags::FD_CLOSE).unwrap();
        let gunzip = CompressionCodec::decompressor(CompressionFormat::Gzip).unwrap();
        r.codec_attach(Box::new(gunzip), Position::Head).unwrap();
        assert_eq!(read_all(&mut r), body);
    }

    #[test]
    fn borrowed_descriptor_stays_open_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.log");
        let file = OpenOptions::new().create(true).append(true).open(&path).unwrap();
        let desc = Descriptor::File(file);

        let mut s = Stream::create(FdTransport::borrowed(&desc).unwrap()).unwrap();
        s.write(b"from stream\n").unwrap();
        s.close().unwrap();

        let Descriptor::File(mut file) = desc else { unreachable!() };
        file.write_all(b"from caller\n").unwrap();
        drop(file);

        let mut text = String::new();
        File::open(&path).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "from stream\nfrom caller\n");
    }

    #[test]
    fn borrowed_socket_keeps_the_connection_open_after_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (mut server, _) = listener.accept().unwrap();
        let desc = Descriptor::Tcp(client);

        let t = FdTransport::borrowed(&desc).unwrap();
        assert!(t.is_borrowed());
        let mut s = Stream::create(t).unwrap();
        s.write(b"from stream\n").unwrap();
        s.close().unwrap();
        s.free().unwrap();

        let Descriptor::Tcp(mut client) = desc else { unreachable!() };
        client.write_all(b"from caller\n").unwrap();
        drop(client);

        let mut text = String::new();
        server.read_to_string(&mut text).unwrap();
        assert_eq!(text, "from stream\nfrom caller\n");
    }

    #[cfg(unix)]
    #[test]
    fn descriptor_without_fd_close_survives_free() {
        use std::os::unix::net::UnixStream;

        let (ours, mut peer) = UnixStream::pair().unwrap();
        peer.set_nonblocking(true).unwrap();

        let mut s = Stream::from_fd(ours, IoFlags::empty()).unwrap();
        s.write(b"hello").unwrap();
        s.close().unwrap();
        s.free().unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(peer.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"hello");
        // the descriptor is still open, so the peer sees no EOF
        let err = peer.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock);
    }

    #[test]
    fn socket_seek_is_unsupported() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        let mut s = Stream::from_fd(client, IoFlags::FD_CLOSE).unwrap();
        assert!(matches!(s.seek(0), Err(StreamError::Unsupported(_))));
        assert!(matches!(s.tell(), Err(StreamError::Unsupported(_))));

        s.write(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        s.flush().unwrap();
        let mut req = [0u8; 18];
        server.read_exact(&mut req).unwrap();
        assert_eq!(&req, b"GET / HTTP/1.0\r\n\r\n");

        server.write_all(b"HTTP/1.0 200 OK\r\n").unwrap();
        drop(server);
        let mut line = Vec::new();
        s.getline(&mut line).unwrap();
        assert_eq!(line, b"HTTP/1.0 200 OK\r\n");
        assert!(read_all(&mut s).is_empty());
    }
}
