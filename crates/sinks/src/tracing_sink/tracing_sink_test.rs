//! Tests for the tracing sink

use std::io::Write;
use std::sync::Arc;

use logport_protocol::{Record, RecordFormat};
use parking_lot::Mutex;
use tracing::Level;

use super::TracingSink;
use crate::Sink;

/// Writer collecting subscriber output in memory
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

fn capture<F: FnOnce()>(max_level: Level, f: F) -> String {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(max_level)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    captured.text()
}

#[test]
fn test_record_emitted_at_configured_level() {
    let sink = TracingSink::new(Level::WARN);
    let record = Record::from_text(RecordFormat::Json, r#"{"msg":"hello"}"#)
        .with_peer("10.0.0.7:4000".parse().unwrap());

    let output = capture(Level::TRACE, || sink.accept(record).unwrap());

    assert!(output.contains("WARN"));
    assert!(output.contains("logport::record"));
    assert!(output.contains(r#"{"msg":"hello"}"#));
    assert!(output.contains("10.0.0.7:4000"));
    assert!(output.contains("format=\"json\""));
}

#[test]
fn test_filtered_level_still_counted() {
    let sink = TracingSink::new(Level::DEBUG);
    let record = Record::from_text(RecordFormat::Json, "{}");

    let output = capture(Level::INFO, || sink.accept(record).unwrap());

    assert!(output.is_empty());
    assert_eq!(sink.metrics().records_received, 1);
}

#[test]
fn test_default_level() {
    assert_eq!(TracingSink::default().level(), Level::INFO);
    assert_eq!(TracingSink::default().name(), "tracing");
}
