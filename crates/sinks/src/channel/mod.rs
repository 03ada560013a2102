//! Channel sink - forwards records to another task
//!
//! Bridges the synchronous `Sink::accept` call into async consumers through a
//! bounded tokio channel. `accept` never waits: when the channel is full the
//! record is dropped and counted.

use logport_protocol::Record;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::common::{MetricsSnapshot, Sink, SinkError, SinkMetrics};

/// Sink forwarding records into a bounded channel
#[derive(Debug)]
pub struct ChannelSink {
    sender: mpsc::Sender<Record>,
    name: String,
    metrics: SinkMetrics,
}

impl ChannelSink {
    /// Create a sink and the receiver draining it
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Record>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::from_sender(sender), receiver)
    }

    /// Wrap an existing sender
    pub fn from_sender(sender: mpsc::Sender<Record>) -> Self {
        Self {
            sender,
            name: "channel".into(),
            metrics: SinkMetrics::new(),
        }
    }
}

impl Sink for ChannelSink {
    fn accept(&self, record: Record) -> Result<(), SinkError> {
        self.metrics.record_received();
        let len = record.len() as u64;

        match self.sender.try_send(record) {
            Ok(()) => {
                self.metrics.record_written(len);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.record_dropped();
                Err(SinkError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.record_dropped();
                Err(SinkError::ChannelClosed)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
