#[cfg(test)]
mod tests {
    use kio_core::constants::{DEFAULT_MAX_LINE, DEFAULT_RBUF_SIZE};
    use kio_core::stream::{Stream, StreamConfig};
    use kio_core::telemetry::StreamCounters;
    use kio_core::transport::MemTransport;
    use kio_core::types::StreamError;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = StreamConfig::from_json(r#"{ "wbuf_size": 512, "name": "static" }"#).unwrap();
        assert_eq!(cfg.wbuf_size, 512);
        assert_eq!(cfg.rbuf_size, DEFAULT_RBUF_SIZE);
        assert_eq!(cfg.max_line, DEFAULT_MAX_LINE);
        assert_eq!(cfg.name.as_deref(), Some("static"));
    }

    #[test]
    fn malformed_json_is_invalid_argument() {
        assert!(matches!(
            StreamConfig::from_json("{ not json"),
            Err(StreamError::InvalidArgument(_))
        ));
    }

    #[test]
    fn staging_below_one_block_is_rejected() {
        let err = StreamConfig::from_json(r#"{ "staging_size": 8 }"#).unwrap_err();
        assert!(matches!(err, StreamError::InvalidArgument(_)));

        let cfg = StreamConfig { rbuf_size: 0, ..StreamConfig::default() };
        assert!(Stream::with_config(MemTransport::owned(Vec::new()), cfg).is_err());
    }

    #[test]
    fn config_name_is_the_stream_name() {
        let cfg = StreamConfig::default().with_name("upload");
        let s = Stream::with_config(MemTransport::owned(Vec::new()), cfg.clone()).unwrap();
        assert_eq!(s.name().as_deref(), Some("upload"));
        assert_eq!(s.config(), cfg);
    }

    #[test]
    fn counters_merge_and_ratio() {
        let mut a = StreamCounters { bytes_accepted: 1000, bytes_to_transport: 250, ..Default::default() };
        let b = StreamCounters { bytes_accepted: 1000, bytes_to_transport: 750, transport_closes: 1, ..Default::default() };
        a.merge(&b);
        assert_eq!(a.bytes_accepted, 2000);
        assert_eq!(a.transport_closes, 1);
        assert!((a.compression_ratio() - 0.5).abs() < f64::EPSILON);
        assert_eq!(StreamCounters::default().compression_ratio(), 0.0);

        let json = serde_json::to_string(&a).unwrap();
        let back: StreamCounters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }
}
