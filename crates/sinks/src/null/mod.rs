//! Null sink - discards all records
//!
//! Counts what it receives and drops it. Useful for measuring transport
//! throughput without sink I/O, and as the default when no sink is configured.

use logport_protocol::Record;

use crate::common::{MetricsSnapshot, Sink, SinkError, SinkMetrics};

/// Sink that discards every record
#[derive(Debug)]
pub struct NullSink {
    name: String,
    metrics: SinkMetrics,
}

impl NullSink {
    pub fn new() -> Self {
        Self::with_name("null")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metrics: SinkMetrics::new(),
        }
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for NullSink {
    #[inline]
    fn accept(&self, record: Record) -> Result<(), SinkError> {
        self.metrics.record_received();
        self.metrics.record_written(record.len() as u64);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
