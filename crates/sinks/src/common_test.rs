//! Tests for common sink types and utilities

use logport_protocol::{Record, RecordFormat};

use crate::{SinkError, SinkMetrics, render_body};

#[test]
fn test_metrics_new() {
    let snapshot = SinkMetrics::new().snapshot();

    assert_eq!(snapshot.records_received, 0);
    assert_eq!(snapshot.records_written, 0);
    assert_eq!(snapshot.bytes_written, 0);
    assert_eq!(snapshot.records_dropped, 0);
    assert_eq!(snapshot.write_errors, 0);
    assert_eq!(snapshot.flush_count, 0);
}

#[test]
fn test_metrics_tracking() {
    let metrics = SinkMetrics::new();

    metrics.record_received();
    metrics.record_received();
    metrics.record_received();
    metrics.record_written(100);
    metrics.record_written(50);
    metrics.record_dropped();
    metrics.write_error();
    metrics.flush();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.records_received, 3);
    assert_eq!(snapshot.records_written, 2);
    assert_eq!(snapshot.bytes_written, 150);
    assert_eq!(snapshot.records_dropped, 1);
    assert_eq!(snapshot.write_errors, 1);
    assert_eq!(snapshot.flush_count, 1);
}

#[test]
fn test_error_display() {
    assert!(SinkError::init("bad path").to_string().contains("bad path"));
    assert!(SinkError::write("disk full").to_string().contains("disk full"));
    assert_eq!(SinkError::ChannelClosed.to_string(), "channel closed");

    let io = std::io::Error::other("boom");
    let err: SinkError = io.into();
    assert!(matches!(err, SinkError::Io(_)));
}

#[test]
fn test_render_text_body() {
    let record = Record::from_text(RecordFormat::Json, r#"{"a":1}"#);
    assert_eq!(render_body(&record), r#"{"a":1}"#);
}

#[test]
fn test_render_msgpack_body_as_json() {
    let value = serde_json::json!({"level": "INFO"});
    let record = Record::new(RecordFormat::MessagePack, rmp_serde::to_vec(&value).unwrap());
    assert_eq!(render_body(&record), r#"{"level":"INFO"}"#);
}

#[test]
fn test_render_corrupt_msgpack_body() {
    let record = Record::new(RecordFormat::MessagePack, vec![0xC1, 0x01]);
    assert_eq!(render_body(&record), "<2 bytes msgpack>");
}
