//! Common types and utilities for sinks
//!
//! Shared functionality across all sink types.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

use logport_protocol::{Record, RecordFormat};
use thiserror::Error;

/// A downstream consumer of framed records
///
/// `accept` is called once per record, from the task that framed it. An error
/// is reported to the caller but never ends the stream the record came from.
pub trait Sink: Send + Sync {
    /// Accept one record
    fn accept(&self, record: Record) -> Result<(), SinkError>;

    /// Sink name for logging
    fn name(&self) -> &str;

    /// Current metrics
    fn metrics(&self) -> MetricsSnapshot;

    /// Flush buffered output, if any
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Metrics shared by all sink types
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Records passed to `accept`
    pub records_received: AtomicU64,

    /// Records written to the destination
    pub records_written: AtomicU64,

    /// Body bytes written
    pub bytes_written: AtomicU64,

    /// Records discarded without being written
    pub records_dropped: AtomicU64,

    /// Write errors encountered
    pub write_errors: AtomicU64,

    /// Flush operations performed
    pub flush_count: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            records_received: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successfully written record
    #[inline]
    pub fn record_written(&self, bytes: u64) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn flush(&self) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            flush_count: self.flush_count.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_received: u64,
    pub records_written: u64,
    pub bytes_written: u64,
    pub records_dropped: u64,
    pub write_errors: u64,
    pub flush_count: u64,
}

/// Common sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Sink initialization failed
    #[error("failed to initialize sink: {0}")]
    Init(String),

    /// Failed to write data
    #[error("write failed: {0}")]
    Write(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Receiving side of a channel sink is gone
    #[error("channel closed")]
    ChannelClosed,

    /// Channel sink queue is full, record dropped
    #[error("queue full, record dropped")]
    QueueFull,
}

impl SinkError {
    /// Create an initialization error
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Create a write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }
}

/// Render a record body as one line of text
///
/// Text records are returned as-is. MessagePack records are rendered as JSON
/// when they decode, otherwise as a byte count.
pub fn render_body(record: &Record) -> Cow<'_, str> {
    if let Some(text) = record.as_str() {
        return Cow::Borrowed(text);
    }
    match record.format() {
        RecordFormat::MessagePack => {
            match rmp_serde::from_slice::<serde_json::Value>(record.body()) {
                Ok(value) => Cow::Owned(value.to_string()),
                Err(_) => Cow::Owned(format!("<{} bytes msgpack>", record.len())),
            }
        }
        _ => Cow::Owned(String::from_utf8_lossy(record.body()).into_owned()),
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
