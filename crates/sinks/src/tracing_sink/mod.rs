//! Tracing sink - re-emits records into the local log pipeline
//!
//! Each record becomes one `tracing` event under the `logport::record` target
//! at the configured level, so the subscriber installed by the binary decides
//! where records end up and how they are formatted.

use logport_protocol::Record;
use tracing::Level;

use crate::common::{MetricsSnapshot, Sink, SinkError, SinkMetrics, render_body};

/// Target used for every re-emitted record
pub const RECORD_TARGET: &str = "logport::record";

/// Sink emitting records as tracing events
#[derive(Debug)]
pub struct TracingSink {
    level: Level,
    name: String,
    metrics: SinkMetrics,
}

impl TracingSink {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            name: "tracing".into(),
            metrics: SinkMetrics::new(),
        }
    }

    #[inline]
    pub fn level(&self) -> Level {
        self.level
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl Sink for TracingSink {
    fn accept(&self, record: Record) -> Result<(), SinkError> {
        self.metrics.record_received();

        let body = render_body(&record);
        let format = record.format().as_str();
        let peer = record
            .peer()
            .map_or_else(String::new, |addr| addr.to_string());

        // tracing needs a constant level per callsite
        match self.level {
            Level::ERROR => tracing::error!(target: RECORD_TARGET, %peer, format, "{body}"),
            Level::WARN => tracing::warn!(target: RECORD_TARGET, %peer, format, "{body}"),
            Level::INFO => tracing::info!(target: RECORD_TARGET, %peer, format, "{body}"),
            Level::DEBUG => tracing::debug!(target: RECORD_TARGET, %peer, format, "{body}"),
            _ => tracing::trace!(target: RECORD_TARGET, %peer, format, "{body}"),
        }

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

#[cfg(test)]
#[path = "tracing_sink_test.rs"]
mod tracing_sink_test;
